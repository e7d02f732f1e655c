//! Operator-side pieces of the arena: configuration, the SQLite record sink
//! and the command-line agent backend used by the `arena` binary.

pub mod command;
pub mod config;
pub mod sqlite;

pub use command::CommandBackend;
pub use config::{AgentConfig, LoggingConfig, ServerConfig, StorageConfig, DEFAULT_CONFIG_PATH};
pub use sqlite::SqliteSink;
