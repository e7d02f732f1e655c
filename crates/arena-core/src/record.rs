//! Persisted shapes: finished-match records, model profiles, rating history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GameResult, Termination, TournamentId};

/// Identifier assigned by the record sink.
pub type RecordId = i64;

/// Storage-agnostic record of one finished match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: Option<RecordId>,
    pub white: String,
    pub black: String,
    pub result: GameResult,
    pub termination: Option<Termination>,
    pub transcript: String,
    pub ply_count: u32,
    pub opening: String,
    pub played_at: DateTime<Utc>,
    pub tournament_id: Option<TournamentId>,
    /// Free-form analysis payload; the engine never inspects it.
    #[serde(default)]
    pub analysis: serde_json::Value,
}

impl MatchRecord {
    pub fn involves(&self, participant: &str) -> bool {
        self.white == participant || self.black == participant
    }
}

/// Selection applied when loading match history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub participant: Option<String>,
    pub tournament_id: Option<TournamentId>,
    pub since: Option<DateTime<Utc>>,
    /// Keep only the most recent `limit` records (still returned oldest first).
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_participant(name: impl Into<String>) -> Self {
        Self {
            participant: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn for_tournament(id: TournamentId) -> Self {
        Self {
            tournament_id: Some(id),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &MatchRecord) -> bool {
        if let Some(name) = &self.participant {
            if !record.involves(name) {
                return false;
            }
        }
        if let Some(id) = self.tournament_id {
            if record.tournament_id != Some(id) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.played_at < since {
                return false;
            }
        }
        true
    }

    /// Apply the filter to records already in chronological order.
    pub fn apply(&self, records: impl IntoIterator<Item = MatchRecord>) -> Vec<MatchRecord> {
        let mut kept: Vec<MatchRecord> = records.into_iter().filter(|r| self.matches(r)).collect();
        if let Some(limit) = self.limit {
            if kept.len() > limit {
                kept.drain(..kept.len() - limit);
            }
        }
        kept
    }
}

/// A registered agent and its current standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub name: String,
    #[serde(default = "default_profile_rating")]
    pub rating: i32,
    #[serde(default)]
    pub games_played: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Backend label, e.g. "openai" or "anthropic".
    #[serde(default)]
    pub provider: Option<String>,
}

fn default_profile_rating() -> i32 {
    1500
}

fn default_active() -> bool {
    true
}

impl ModelProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rating: default_profile_rating(),
            games_played: 0,
            active: true,
            provider: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Rating of one model right after one processed match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub model: String,
    pub rating: i32,
    pub date: DateTime<Utc>,
    pub record_id: Option<RecordId>,
}
