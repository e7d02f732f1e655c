//! Round-robin tournament data: schedule construction and snapshots.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, ArenaResult};
use crate::standings::Standing;
use crate::types::{GameResult, MatchId, MatchStatus, TournamentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    Playing,
    Finished,
    Stopped,
}

impl TournamentStatus {
    pub fn is_terminal(self) -> bool {
        self != TournamentStatus::Playing
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TournamentStatus::Playing => "playing",
            TournamentStatus::Finished => "finished",
            TournamentStatus::Stopped => "stopped",
        })
    }
}

/// One ordered (white, black) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pairing {
    pub white: String,
    pub black: String,
}

/// A scheduled game: a pairing plus its repetition number within that pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub pairing_index: usize,
    /// 1-based game number inside the pairing.
    pub game: u32,
    pub white: String,
    pub black: String,
}

/// Reject participant lists with fewer than two names, blanks or duplicates.
pub fn validate_participants(participants: &[String], games_per_pair: u32) -> ArenaResult<()> {
    if participants.len() < 2 {
        return Err(ArenaError::InvalidTournamentConfig(format!(
            "at least 2 participants required, got {}",
            participants.len()
        )));
    }
    if games_per_pair == 0 {
        return Err(ArenaError::InvalidTournamentConfig(
            "games per pair must be at least 1".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(participants.len());
    for name in participants {
        if name.trim().is_empty() {
            return Err(ArenaError::InvalidTournamentConfig(
                "participant names must not be empty".to_string(),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ArenaError::InvalidTournamentConfig(format!(
                "duplicate participant '{name}'"
            )));
        }
    }
    Ok(())
}

/// Every ordered pair (i, j) with i != j, in participant order.
pub fn round_robin_pairings(participants: &[String]) -> Vec<Pairing> {
    let mut pairings = Vec::with_capacity(participants.len() * participants.len().saturating_sub(1));
    for (i, white) in participants.iter().enumerate() {
        for (j, black) in participants.iter().enumerate() {
            if i != j {
                pairings.push(Pairing {
                    white: white.clone(),
                    black: black.clone(),
                });
            }
        }
    }
    pairings
}

/// Full schedule: each pairing repeated `games_per_pair` times, consecutively.
pub fn build_schedule(pairings: &[Pairing], games_per_pair: u32) -> Vec<ScheduledGame> {
    pairings
        .iter()
        .enumerate()
        .flat_map(|(pairing_index, pairing)| {
            (1..=games_per_pair).map(move |game| ScheduledGame {
                pairing_index,
                game,
                white: pairing.white.clone(),
                black: pairing.black.clone(),
            })
        })
        .collect()
}

/// Outcome of one tournament game as merged into the standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentGame {
    pub match_id: MatchId,
    pub pairing_index: usize,
    pub game: u32,
    pub white: String,
    pub black: String,
    pub status: MatchStatus,
    pub result: GameResult,
}

/// Owned copy of a tournament's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentSnapshot {
    pub id: TournamentId,
    pub participants: Vec<String>,
    pub games_per_pair: u32,
    pub status: TournamentStatus,
    pub pairings: Vec<Pairing>,
    /// Index into `pairings` of the pairing being played (or last played).
    pub current_pairing: usize,
    pub completed_pairings: usize,
    pub total_games: usize,
    pub match_ids: Vec<MatchId>,
    pub games: Vec<TournamentGame>,
    pub standings: Vec<Standing>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TournamentSnapshot {
    pub fn new(id: TournamentId, participants: Vec<String>, games_per_pair: u32) -> Self {
        let pairings = round_robin_pairings(&participants);
        let total_games = pairings.len() * games_per_pair as usize;
        let now = Utc::now();
        Self {
            id,
            participants,
            games_per_pair,
            status: TournamentStatus::Playing,
            pairings,
            current_pairing: 0,
            completed_pairings: 0,
            total_games,
            match_ids: Vec::new(),
            games: Vec::new(),
            standings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn completed_games(&self) -> usize {
        self.games.len()
    }
}

#[cfg(test)]
#[path = "tournament_tests.rs"]
mod tournament_tests;
