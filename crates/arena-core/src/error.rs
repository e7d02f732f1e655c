//! Error taxonomy shared by every arena crate.

use thiserror::Error;

use crate::types::{MatchId, TournamentId};

/// Errors raised by the rules adapter, move sources and orchestration layer.
///
/// `IllegalMove` and `SourceUnavailable` end only the match that raised them.
/// The `*NotFound` variants are ordinary lookup results, and `Persistence`
/// is logged by the runner without touching in-memory state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// A move source proposed a move that is not legal in the position.
    #[error("illegal move {mv} in position {fen}")]
    IllegalMove { mv: String, fen: String },

    /// Move text that is malformed, ambiguous or matches no legal move.
    #[error("invalid move notation '{text}': {reason}")]
    InvalidNotation { text: String, reason: String },

    /// A FEN string the rules oracle refused.
    #[error("invalid position '{0}'")]
    InvalidPosition(String),

    /// A participant could not be resolved, or its backend failed.
    #[error("move source unavailable for {participant}: {reason}")]
    SourceUnavailable { participant: String, reason: String },

    #[error("match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("invalid tournament config: {0}")]
    InvalidTournamentConfig(String),

    /// The record sink failed to store or load history.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ArenaError {
    pub fn invalid_notation(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNotation {
            text: text.into(),
            reason: reason.into(),
        }
    }

    pub fn source_unavailable(participant: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            participant: participant.into(),
            reason: reason.into(),
        }
    }

    /// True for lookup failures that callers should map to "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MatchNotFound(_) | Self::TournamentNotFound(_))
    }
}

pub type ArenaResult<T> = Result<T, ArenaError>;
