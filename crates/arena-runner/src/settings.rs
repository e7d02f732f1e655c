//! Runtime settings for the orchestration engine.

use std::time::Duration;

use arena_core::{RatingConfig, TieBreak};
use serde::{Deserialize, Serialize};

/// Default ply ceiling before a game is scored as a draw.
pub const DEFAULT_MAX_PLIES: u32 = 200;

/// Opening every tournament game starts from.
pub const DEFAULT_TOURNAMENT_OPENING: &str = "1. e4";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    /// Safety valve against non-terminating play.
    pub max_plies: u32,
    pub tournament_opening: String,
    /// Pacing delay between moves of tournament games, in milliseconds.
    pub tournament_pacing_ms: u64,
    /// Upper bound on a single agent backend call, in milliseconds.
    pub agent_timeout_ms: u64,
    pub tie_break: TieBreak,
    pub rating: RatingConfig,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            max_plies: DEFAULT_MAX_PLIES,
            tournament_opening: DEFAULT_TOURNAMENT_OPENING.to_string(),
            tournament_pacing_ms: 100,
            agent_timeout_ms: 30_000,
            tie_break: TieBreak::default(),
            rating: RatingConfig::default(),
        }
    }
}

impl ArenaSettings {
    pub fn tournament_pacing(&self) -> Duration {
        Duration::from_millis(self.tournament_pacing_ms)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_timeout_ms)
    }
}
