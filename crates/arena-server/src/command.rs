//! Agent backend that shells out to an external program.
//!
//! The prompt is written to the program's stdin and its stdout is taken as
//! the reply. The model name and the full move context (JSON) are passed in
//! the `ARENA_MODEL` and `ARENA_CONTEXT` environment variables, so a small
//! script can forward the request to any provider.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use arena_runner::{AgentBackend, MoveContext};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Backend from a `[program, args...]` list; `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl AgentBackend for CommandBackend {
    async fn request_move(&self, context: &MoveContext) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("ARENA_MODEL", &context.model)
            .env("ARENA_CONTEXT", serde_json::to_string(context)?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start agent command '{}'", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A program that ignores stdin may exit before reading it.
            if let Err(e) = stdin.write_all(context.prompt().as_bytes()).await {
                debug!(program = %self.program, error = %e, "agent command did not read the prompt");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("agent command '{}' failed", self.program))?;
        if !output.status.success() {
            bail!(
                "agent command '{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod command_tests;
