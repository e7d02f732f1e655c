//! Move sources: anything that can propose the next move for one side.
//!
//! A match owns one boxed [`MoveSource`] per side. Sources are resolved from
//! participant names through a [`SourceResolver`]; the stock resolver is the
//! [`Roster`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arena_core::{
    ArenaError, ArenaResult, ModelProfile, Move, MoveOrigin, MoveRecord, Position,
};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::agent::{AgentBackend, AgentSource};

/// Built-in participant that always plays the first legal move.
pub const FIRST_LEGAL: &str = "first-legal";

/// Built-in participant that plays a uniformly random legal move.
pub const RANDOM: &str = "random";

/// A move chosen by a source, not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedMove {
    pub mv: Move,
    pub explanation: Option<String>,
    pub origin: MoveOrigin,
}

impl ProposedMove {
    pub fn new(mv: Move, origin: MoveOrigin) -> Self {
        Self {
            mv,
            explanation: None,
            origin,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// Produces moves for one side of a match.
#[async_trait]
pub trait MoveSource: Send {
    /// Short name used in logs.
    fn label(&self) -> &str;

    /// Propose a move for the side to move in `position`.
    ///
    /// `Ok(None)` means the source resigns or has nothing to offer. The
    /// proposal is validated by the caller before it is applied.
    async fn next_move(
        &mut self,
        position: &Position,
        history: &[MoveRecord],
    ) -> ArenaResult<Option<ProposedMove>>;
}

/// Plays the scripted opening while the game is still on it, then hands over.
pub struct OpeningBook {
    /// Opening moves with their UCI text, from the starting position.
    line: Vec<(Move, String)>,
    inner: Box<dyn MoveSource>,
}

impl OpeningBook {
    /// Parse `opening` from `start`; fails with `InvalidNotation`.
    pub fn new(start: &Position, opening: &str, inner: Box<dyn MoveSource>) -> ArenaResult<Self> {
        Ok(Self::from_line(opening_line(start, opening)?, inner))
    }

    /// Book over an already parsed line (see [`opening_line`]).
    pub fn from_line(line: Vec<(Move, String)>, inner: Box<dyn MoveSource>) -> Self {
        Self { line, inner }
    }

    fn book_move(&self, position: &Position, history: &[MoveRecord]) -> Option<Move> {
        let (mv, _) = self.line.get(history.len())?;
        let on_line = history
            .iter()
            .zip(&self.line)
            .all(|(played, (_, uci))| played.uci == *uci);
        (on_line && position.is_legal(*mv)).then_some(*mv)
    }
}

/// Parse an opening line into moves paired with their UCI text.
pub fn opening_line(start: &Position, opening: &str) -> ArenaResult<Vec<(Move, String)>> {
    let moves = start.parse_opening(opening)?;
    let mut pos = start.clone();
    let mut line = Vec::with_capacity(moves.len());
    for mv in moves {
        line.push((mv, pos.to_uci(mv)));
        pos = pos.apply(mv)?;
    }
    Ok(line)
}

#[async_trait]
impl MoveSource for OpeningBook {
    fn label(&self) -> &str {
        self.inner.label()
    }

    async fn next_move(
        &mut self,
        position: &Position,
        history: &[MoveRecord],
    ) -> ArenaResult<Option<ProposedMove>> {
        if let Some(mv) = self.book_move(position, history) {
            return Ok(Some(ProposedMove::new(mv, MoveOrigin::Opening)));
        }
        self.inner.next_move(position, history).await
    }
}

/// First legal move in generation order. Fully deterministic.
#[derive(Debug, Clone)]
pub struct FirstLegal {
    label: String,
}

impl FirstLegal {
    pub fn new() -> Self {
        Self::named(FIRST_LEGAL)
    }

    pub fn named(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for FirstLegal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MoveSource for FirstLegal {
    fn label(&self) -> &str {
        &self.label
    }

    async fn next_move(
        &mut self,
        position: &Position,
        _history: &[MoveRecord],
    ) -> ArenaResult<Option<ProposedMove>> {
        Ok(position
            .legal_moves()
            .first()
            .map(|mv| ProposedMove::new(*mv, MoveOrigin::Fallback)))
    }
}

/// Uniformly random legal move.
pub struct RandomLegal {
    rng: StdRng,
}

impl RandomLegal {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomLegal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MoveSource for RandomLegal {
    fn label(&self) -> &str {
        RANDOM
    }

    async fn next_move(
        &mut self,
        position: &Position,
        _history: &[MoveRecord],
    ) -> ArenaResult<Option<ProposedMove>> {
        let moves = position.legal_moves();
        Ok(moves
            .choose(&mut self.rng)
            .map(|mv| ProposedMove::new(*mv, MoveOrigin::Random)))
    }
}

/// Sending half of a [`HumanInput`]; submits move text (SAN or UCI).
#[derive(Debug, Clone)]
pub struct HumanMoveSender {
    tx: mpsc::UnboundedSender<String>,
}

impl HumanMoveSender {
    /// Queue a move. Returns false once the match no longer listens.
    pub fn submit(&self, text: impl Into<String>) -> bool {
        self.tx.send(text.into()).is_ok()
    }
}

/// Moves typed by a person, delivered over a channel.
///
/// Text that does not parse to a legal move is logged and skipped. Dropping
/// every sender resigns the game.
pub struct HumanInput {
    label: String,
    rx: mpsc::UnboundedReceiver<String>,
}

impl HumanInput {
    pub fn channel(label: impl Into<String>) -> (HumanInput, HumanMoveSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            HumanInput {
                label: label.into(),
                rx,
            },
            HumanMoveSender { tx },
        )
    }
}

#[async_trait]
impl MoveSource for HumanInput {
    fn label(&self) -> &str {
        &self.label
    }

    async fn next_move(
        &mut self,
        position: &Position,
        _history: &[MoveRecord],
    ) -> ArenaResult<Option<ProposedMove>> {
        while let Some(text) = self.rx.recv().await {
            match position.parse_san(&text) {
                Ok(mv) => return Ok(Some(ProposedMove::new(mv, MoveOrigin::Human))),
                Err(e) => warn!(participant = %self.label, input = %text, error = %e, "rejected human move"),
            }
        }
        debug!(participant = %self.label, "human input closed, resigning");
        Ok(None)
    }
}

/// Maps participant names to move sources.
pub trait SourceResolver: Send + Sync {
    /// Build a fresh source for `participant`; `SourceUnavailable` if it
    /// cannot play.
    fn resolve(&self, participant: &str) -> ArenaResult<Box<dyn MoveSource>>;
}

/// Registered participants and how to drive them.
///
/// Resolution order: pending human seats, the built-ins [`FIRST_LEGAL`] and
/// [`RANDOM`], then registered models. Models are driven by the agent
/// backend when one is configured and by [`FirstLegal`] otherwise.
pub struct Roster {
    models: Vec<ModelProfile>,
    backend: Option<Arc<dyn AgentBackend>>,
    agent_timeout: Duration,
    humans: Mutex<HashMap<String, HumanInput>>,
    seed: Option<u64>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
            backend: None,
            agent_timeout: Duration::from_secs(30),
            humans: Mutex::new(HashMap::new()),
            seed: None,
        }
    }

    pub fn with_models(mut self, models: impl IntoIterator<Item = ModelProfile>) -> Self {
        for model in models {
            self.register(model);
        }
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn AgentBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    /// Seed for every `random` source this roster creates.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Add or replace a model profile.
    pub fn register(&mut self, profile: ModelProfile) {
        match self.models.iter_mut().find(|m| m.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.models.push(profile),
        }
    }

    pub fn models(&self) -> &[ModelProfile] {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&ModelProfile> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Reserve a human seat; the next match that resolves `name` consumes it.
    pub fn seat_human(&self, name: impl Into<String>) -> HumanMoveSender {
        let name = name.into();
        let (input, sender) = HumanInput::channel(name.clone());
        self.humans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, input);
        sender
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceResolver for Roster {
    fn resolve(&self, participant: &str) -> ArenaResult<Box<dyn MoveSource>> {
        let human = self
            .humans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(participant);
        if let Some(human) = human {
            return Ok(Box::new(human));
        }

        match participant {
            FIRST_LEGAL => return Ok(Box::new(FirstLegal::new())),
            RANDOM => {
                let source = match self.seed {
                    Some(seed) => RandomLegal::seeded(seed),
                    None => RandomLegal::new(),
                };
                return Ok(Box::new(source));
            }
            _ => {}
        }

        let profile = self
            .model(participant)
            .ok_or_else(|| ArenaError::source_unavailable(participant, "unknown participant"))?;
        if !profile.active {
            return Err(ArenaError::source_unavailable(participant, "model is inactive"));
        }

        match &self.backend {
            Some(backend) => Ok(Box::new(AgentSource::new(
                participant,
                Arc::clone(backend),
                self.agent_timeout,
            ))),
            None => {
                debug!(participant, "no agent backend configured, using first legal move");
                Ok(Box::new(FirstLegal::named(participant)))
            }
        }
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod source_tests;
