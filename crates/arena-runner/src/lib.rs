//! Match orchestration for the agent chess arena.
//!
//! This crate runs games and tournaments on tokio:
//! - move sources (scripted openings, fallbacks, humans, agent backends)
//! - the per-match runner task and the round-robin scheduler
//! - registries of live matches and tournaments
//! - event fan-out to subscribers and the record sink for finished games
//!
//! Everything is reached through an [`Arena`] value:
//!
//! ```no_run
//! # async fn demo() -> arena_core::ArenaResult<()> {
//! use std::sync::Arc;
//! use std::time::Duration;
//! use arena_runner::{Arena, Roster};
//!
//! let arena = Arena::in_memory(Arc::new(Roster::new()));
//! let id = arena.start_match("first-legal", "random", "1. e4", Duration::ZERO)?;
//! let finished = arena.wait_for_match(id).await?;
//! println!("{}", finished.transcript);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod arena;
pub mod broadcast;
pub mod event;
pub mod match_runner;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod source;
pub mod store;

pub use agent::{AgentBackend, AgentSource, MoveContext};
pub use arena::Arena;
pub use broadcast::{Broadcaster, EventSink, SubscriberId, Subscription};
pub use event::ArenaEvent;
pub use match_runner::{MatchHandle, MatchSpec, PendingMatch};
pub use registry::{Registry, Tracked};
pub use scheduler::{MatchLauncher, PendingTournament, TournamentHandle, TournamentSpec};
pub use settings::ArenaSettings;
pub use source::{
    FirstLegal, HumanInput, HumanMoveSender, MoveSource, OpeningBook, ProposedMove, RandomLegal,
    Roster, SourceResolver, FIRST_LEGAL, RANDOM,
};
pub use store::{DisabledSink, MemorySink, RecordSink};
