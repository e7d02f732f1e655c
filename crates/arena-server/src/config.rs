//! TOML configuration for the `arena` binary.
//!
//! ```toml
//! [arena]
//! max_plies = 200
//! tournament_opening = "1. e4"
//! tournament_pacing_ms = 100
//! agent_timeout_ms = 30000
//! tie_break = "registration"
//!
//! [storage]
//! database_url = "sqlite://arena.db"
//! ratings_path = "arena_elo.json"
//!
//! [logging]
//! level = "info"
//!
//! [agent]
//! command = ["python3", "agents/ask_model.py"]
//!
//! [[models]]
//! name = "gpt-4o"
//! provider = "openai"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arena_core::ModelProfile;
use arena_runner::{ArenaSettings, Roster};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::CommandBackend;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "arena.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub arena: ArenaSettings,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub agent: AgentConfig,
    pub models: Vec<ModelProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite connection string; the file is created if missing.
    pub database_url: String,
    /// Where the rating table is written after each run.
    pub ratings_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://arena.db".to_string(),
            ratings_path: PathBuf::from("arena_elo.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// External program that answers move requests for registered models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Program and arguments; empty disables the backend.
    pub command: Vec<String>,
}

impl ServerConfig {
    /// Read `path`, or fall back to defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Roster of the configured models, driven by the agent command if one
    /// is set.
    pub fn roster(&self) -> Roster {
        let roster = Roster::new()
            .with_models(self.models.iter().cloned())
            .with_agent_timeout(self.arena.agent_timeout());
        match CommandBackend::from_argv(&self.agent.command) {
            Some(backend) => roster.with_backend(Arc::new(backend)),
            None => roster,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
