//! Elo rating calculation over finished-match history

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ArenaError, ArenaResult};
use crate::record::{MatchRecord, ModelProfile, RatingSnapshot};
use crate::types::Side;

/// Default starting Elo for new models
pub const DEFAULT_ELO: f64 = 1500.0;

/// K-factor while a model is still provisional
pub const K_FACTOR_PROVISIONAL: f64 = 32.0;

/// K-factor once a model has enough games
pub const K_FACTOR_ESTABLISHED: f64 = 16.0;

/// Games a model plays before its K-factor drops
pub const PROVISIONAL_GAMES: u32 = 30;

/// Tunables of the rating formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub default_rating: f64,
    pub scale: f64,
    pub k_provisional: f64,
    pub k_established: f64,
    pub provisional_games: u32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            default_rating: DEFAULT_ELO,
            scale: 400.0,
            k_provisional: K_FACTOR_PROVISIONAL,
            k_established: K_FACTOR_ESTABLISHED,
            provisional_games: PROVISIONAL_GAMES,
        }
    }
}

impl RatingConfig {
    /// Expected score of a player rated `rating` against `opponent`.
    pub fn expected_score(&self, rating: f64, opponent: f64) -> f64 {
        1.0 / (1.0 + 10.0_f64.powf((opponent - rating) / self.scale))
    }

    pub fn k_factor(&self, games_played: u32) -> f64 {
        if games_played < self.provisional_games {
            self.k_provisional
        } else {
            self.k_established
        }
    }
}

/// Running rating state of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRating {
    pub rating: f64,
    pub games_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl ModelRating {
    fn new(rating: f64) -> Self {
        Self {
            rating,
            games_played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
        }
    }

    /// Rating rounded for display.
    pub fn display_rating(&self) -> i32 {
        self.rating.round() as i32
    }

    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        self.wins as f64 / self.games_played as f64
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub model: String,
    pub rating: i32,
    pub games_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub win_rate: f64,
}

/// Ratings recomputed from a match history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingTable {
    pub ratings: BTreeMap<String, ModelRating>,
    /// One snapshot per model per processed match, in processing order.
    pub history: Vec<RatingSnapshot>,
}

impl RatingTable {
    /// Load a table from a JSON file
    pub fn load(path: impl AsRef<Path>) -> ArenaResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ArenaError::Persistence(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| ArenaError::Persistence(format!("failed to parse {}: {e}", path.display())))
    }

    /// Save the table to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> ArenaResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ArenaError::Persistence(format!("failed to serialize ratings: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| ArenaError::Persistence(format!("failed to write {}: {e}", path.display())))
    }

    pub fn get(&self, model: &str) -> Option<&ModelRating> {
        self.ratings.get(model)
    }

    pub fn history_for<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a RatingSnapshot> + 'a {
        self.history.iter().filter(move |s| s.model == model)
    }

    /// Sorted by descending rating, then name.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .ratings
            .iter()
            .map(|(name, r)| LeaderboardEntry {
                model: name.clone(),
                rating: r.display_rating(),
                games_played: r.games_played,
                wins: r.wins,
                draws: r.draws,
                losses: r.losses,
                win_rate: r.win_rate(),
            })
            .collect();
        entries.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.model.cmp(&b.model))
        });
        entries
    }

    /// Refresh a roster's ratings and game counts; unknown models keep theirs.
    pub fn profiles(&self, roster: &[ModelProfile]) -> Vec<ModelProfile> {
        roster
            .iter()
            .map(|profile| match self.ratings.get(&profile.name) {
                Some(r) => ModelProfile {
                    rating: r.display_rating(),
                    games_played: r.games_played,
                    ..profile.clone()
                },
                None => profile.clone(),
            })
            .collect()
    }

    /// Leaderboard as text
    pub fn format_leaderboard(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Model Leaderboard ===\n");
        out.push_str(&format!(
            "{:<30} {:>8} {:>8} {:>8}\n",
            "Model", "Elo", "Games", "Win %"
        ));
        out.push_str(&"-".repeat(57));
        out.push('\n');
        for entry in self.leaderboard() {
            out.push_str(&format!(
                "{:<30} {:>8} {:>8} {:>7.1}%\n",
                entry.model,
                entry.rating,
                entry.games_played,
                entry.win_rate * 100.0
            ));
        }
        out
    }
}

/// Recomputes ratings from scratch over a match history.
#[derive(Debug, Clone, Default)]
pub struct RatingEngine {
    config: RatingConfig,
}

impl RatingEngine {
    pub fn new(config: RatingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Process `records` in chronological order (stable for equal
    /// timestamps). Records without a result are skipped.
    pub fn compute(&self, records: &[MatchRecord]) -> RatingTable {
        let mut ordered: Vec<&MatchRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.played_at);

        let mut table = RatingTable::default();
        for record in ordered {
            let (Some(white_score), Some(black_score)) = (
                record.result.score_for(Side::White),
                record.result.score_for(Side::Black),
            ) else {
                continue;
            };
            if record.white == record.black {
                continue;
            }

            let default = self.config.default_rating;
            let white = table
                .ratings
                .entry(record.white.clone())
                .or_insert_with(|| ModelRating::new(default))
                .clone();
            let black = table
                .ratings
                .entry(record.black.clone())
                .or_insert_with(|| ModelRating::new(default))
                .clone();

            let white_expected = self.config.expected_score(white.rating, black.rating);
            let black_expected = self.config.expected_score(black.rating, white.rating);
            let white_k = self.config.k_factor(white.games_played);
            let black_k = self.config.k_factor(black.games_played);

            for (name, k, actual, expected) in [
                (&record.white, white_k, white_score, white_expected),
                (&record.black, black_k, black_score, black_expected),
            ] {
                if let Some(entry) = table.ratings.get_mut(name) {
                    entry.rating += k * (actual - expected);
                    entry.games_played += 1;
                    if actual == 1.0 {
                        entry.wins += 1;
                    } else if actual == 0.0 {
                        entry.losses += 1;
                    } else {
                        entry.draws += 1;
                    }
                    table.history.push(RatingSnapshot {
                        model: name.clone(),
                        rating: entry.display_rating(),
                        date: record.played_at,
                        record_id: record.id,
                    });
                }
            }
        }
        table
    }
}

#[cfg(test)]
#[path = "elo_tests.rs"]
mod elo_tests;
