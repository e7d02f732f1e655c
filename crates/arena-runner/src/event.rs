//! Live update events pushed to subscribers.

use arena_core::{MatchId, MatchSnapshot, TournamentId, TournamentSnapshot};
use serde::{Deserialize, Serialize};

/// Tagged event; the `kind` field names the variant on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArenaEvent {
    MatchStarted {
        match_id: MatchId,
        snapshot: MatchSnapshot,
    },
    MoveMade {
        match_id: MatchId,
        snapshot: MatchSnapshot,
    },
    MatchFinished {
        match_id: MatchId,
        snapshot: MatchSnapshot,
    },
    MatchStopped {
        match_id: MatchId,
        snapshot: MatchSnapshot,
    },
    MatchError {
        match_id: MatchId,
        message: String,
        snapshot: MatchSnapshot,
    },
    TournamentStarted {
        tournament_id: TournamentId,
        snapshot: TournamentSnapshot,
    },
    TournamentUpdated {
        tournament_id: TournamentId,
        snapshot: TournamentSnapshot,
    },
    TournamentFinished {
        tournament_id: TournamentId,
        snapshot: TournamentSnapshot,
    },
    TournamentStopped {
        tournament_id: TournamentId,
        snapshot: TournamentSnapshot,
    },
}

impl ArenaEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ArenaEvent::MatchStarted { .. } => "match_started",
            ArenaEvent::MoveMade { .. } => "move_made",
            ArenaEvent::MatchFinished { .. } => "match_finished",
            ArenaEvent::MatchStopped { .. } => "match_stopped",
            ArenaEvent::MatchError { .. } => "match_error",
            ArenaEvent::TournamentStarted { .. } => "tournament_started",
            ArenaEvent::TournamentUpdated { .. } => "tournament_updated",
            ArenaEvent::TournamentFinished { .. } => "tournament_finished",
            ArenaEvent::TournamentStopped { .. } => "tournament_stopped",
        }
    }

    pub fn match_id(&self) -> Option<MatchId> {
        match self {
            ArenaEvent::MatchStarted { match_id, .. }
            | ArenaEvent::MoveMade { match_id, .. }
            | ArenaEvent::MatchFinished { match_id, .. }
            | ArenaEvent::MatchStopped { match_id, .. }
            | ArenaEvent::MatchError { match_id, .. } => Some(*match_id),
            _ => None,
        }
    }

    pub fn tournament_id(&self) -> Option<TournamentId> {
        match self {
            ArenaEvent::TournamentStarted { tournament_id, .. }
            | ArenaEvent::TournamentUpdated { tournament_id, .. }
            | ArenaEvent::TournamentFinished { tournament_id, .. }
            | ArenaEvent::TournamentStopped { tournament_id, .. } => Some(*tournament_id),
            ArenaEvent::MatchStarted { snapshot, .. }
            | ArenaEvent::MoveMade { snapshot, .. }
            | ArenaEvent::MatchFinished { snapshot, .. }
            | ArenaEvent::MatchStopped { snapshot, .. }
            | ArenaEvent::MatchError { snapshot, .. } => snapshot.tournament_id,
        }
    }
}
