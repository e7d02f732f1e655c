//! Agent-backed move source.
//!
//! An [`AgentBackend`] turns a [`MoveContext`] into free-form reply text
//! (usually a language model). [`AgentSource`] builds the context, bounds the
//! call with a timeout and extracts a legal move from whatever comes back.

use std::sync::Arc;
use std::time::Duration;

use arena_core::{ArenaError, ArenaResult, Move, MoveOrigin, MoveRecord, Position, Side};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::source::{MoveSource, ProposedMove};

/// Marker the prompt asks the agent to put before its move.
const MOVE_MARKER: &str = "My move:";

/// Everything an agent is told about the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveContext {
    pub model: String,
    pub fen: String,
    pub side: Side,
    pub move_number: u16,
    /// SAN of every move played so far.
    pub history: Vec<String>,
    pub legal_moves: Vec<String>,
    pub last_move: Option<String>,
}

impl MoveContext {
    pub fn new(model: &str, position: &Position, history: &[MoveRecord]) -> Self {
        let legal_moves = position
            .legal_moves()
            .into_iter()
            .filter_map(|mv| position.to_san(mv).ok())
            .collect();
        Self {
            model: model.to_string(),
            fen: position.fen(),
            side: position.side_to_move(),
            move_number: position.fullmove_number(),
            history: history.iter().map(|r| r.san.clone()).collect(),
            legal_moves,
            last_move: history.last().map(|r| r.san.clone()),
        }
    }

    /// Prompt text sent to the model.
    pub fn prompt(&self) -> String {
        format!(
            "We are currently playing chess. You play {side}.\n\
             \n\
             Last move played: {last}\n\
             Current position (FEN): {fen}\n\
             Move number: {number}\n\
             Game history: {history}\n\
             \n\
             Your legal moves: {legal}\n\
             \n\
             Analyze the position and choose the best move. Consider king safety, \
             piece activity and tactical opportunities.\n\
             \n\
             Answer in this order:\n\
             1. Your move, in the format {marker} \"Move\" (SAN, in English).\n\
             2. A short explanation of why you chose it, in no more than 3 sentences.",
            side = self.side.as_str(),
            last = self.last_move.as_deref().unwrap_or("game start"),
            fen = self.fen,
            number = self.move_number,
            history = self.history.join(" "),
            legal = self.legal_moves.join(", "),
            marker = MOVE_MARKER,
        )
    }
}

/// Remote or local agent that answers move requests with text.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn request_move(&self, context: &MoveContext) -> anyhow::Result<String>;
}

/// Move source that asks an [`AgentBackend`].
pub struct AgentSource {
    model: String,
    backend: Arc<dyn AgentBackend>,
    timeout: Duration,
}

impl AgentSource {
    pub fn new(model: impl Into<String>, backend: Arc<dyn AgentBackend>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            backend,
            timeout,
        }
    }
}

#[async_trait]
impl MoveSource for AgentSource {
    fn label(&self) -> &str {
        &self.model
    }

    async fn next_move(
        &mut self,
        position: &Position,
        history: &[MoveRecord],
    ) -> ArenaResult<Option<ProposedMove>> {
        let context = MoveContext::new(&self.model, position, history);
        if context.legal_moves.is_empty() {
            return Ok(None);
        }

        let reply = match tokio::time::timeout(self.timeout, self.backend.request_move(&context)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                return Err(ArenaError::source_unavailable(&self.model, format!("{e:#}")));
            }
            Err(_) => {
                return Err(ArenaError::source_unavailable(
                    &self.model,
                    format!("no reply within {}ms", self.timeout.as_millis()),
                ));
            }
        };

        let explanation = extract_explanation(&reply);
        let proposed = match extract_move(position, &reply) {
            Some(mv) => {
                debug!(model = %self.model, reply = %reply.trim(), "agent replied");
                ProposedMove::new(mv, MoveOrigin::Agent)
            }
            None => {
                let Some(mv) = position.legal_moves().first().copied() else {
                    return Ok(None);
                };
                warn!(model = %self.model, reply = %reply.trim(), "no legal move in agent reply, playing first legal move");
                ProposedMove::new(mv, MoveOrigin::Fallback)
            }
        };
        Ok(Some(match explanation {
            Some(text) => proposed.with_explanation(text),
            None => proposed,
        }))
    }
}

/// Find a legal move in an agent reply.
///
/// The `My move: "<SAN>"` form wins; otherwise the first token that names a
/// legal move is taken.
pub fn extract_move(position: &Position, reply: &str) -> Option<Move> {
    if let Some(text) = marked_move(reply) {
        if let Ok(mv) = position.parse_san(text) {
            return Some(mv);
        }
    }
    reply
        .split_whitespace()
        .map(clean_token)
        .filter(|token| !token.is_empty())
        .find_map(|token| position.parse_san(token).ok())
}

/// Text after the move line, if the agent gave any.
pub fn extract_explanation(reply: &str) -> Option<String> {
    let start = reply.find(MOVE_MARKER)?;
    let rest = &reply[start..];
    let after_line = rest.find('\n').map(|i| &rest[i + 1..]).unwrap_or("");
    let text = after_line
        .lines()
        .map(|line| line.trim().trim_start_matches("2.").trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

fn marked_move(reply: &str) -> Option<&str> {
    let start = reply.find(MOVE_MARKER)? + MOVE_MARKER.len();
    let line = reply[start..].lines().next()?.trim();
    let text = match line.strip_prefix(['"', '\'']) {
        Some(quoted) => quoted.split(['"', '\'']).next()?,
        None => line.split_whitespace().next()?,
    };
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}

/// Strip everything but SAN characters from a reply token.
fn clean_token(token: &str) -> &str {
    token.trim_matches(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '=' | '#')))
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod agent_tests;
