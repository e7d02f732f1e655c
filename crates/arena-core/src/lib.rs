//! Core types for the agent chess arena.
//!
//! This crate holds everything that does not need a runtime:
//! - the rules adapter over `cozy-chess` (legality, termination, SAN, FEN)
//! - PGN transcript rendering
//! - the match, tournament and persisted-record data model
//! - tournament standings and the Elo rating engine

pub mod elo;
pub mod error;
pub mod pgn;
pub mod record;
pub mod rules;
pub mod standings;
pub mod tournament;
pub mod types;

pub use cozy_chess::Move;
pub use elo::*;
pub use error::{ArenaError, ArenaResult};
pub use pgn::{serialize_transcript, Transcript};
pub use record::*;
pub use rules::Position;
pub use standings::*;
pub use tournament::*;
pub use types::*;
