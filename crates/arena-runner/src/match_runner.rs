//! Match runner: drives one game between two move sources on its own task.
//!
//! A match moves `Waiting -> Playing -> {Finished | Error | Stopped}`. The
//! task owns the authoritative position; observers only ever see owned
//! snapshots cloned out of a short read lock.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use arena_core::{
    ArenaResult, GameResult, MatchId, MatchSnapshot, MatchStatus, Move, MoveRecord, Outcome,
    Position, Side, Termination, TournamentId, Transcript,
};
use chrono::Utc;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::broadcast::Broadcaster;
use crate::event::ArenaEvent;
use crate::settings::DEFAULT_MAX_PLIES;
use crate::source::{opening_line, MoveSource, OpeningBook, SourceResolver};
use crate::store::RecordSink;

/// What to play.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSpec {
    pub white: String,
    pub black: String,
    /// Scripted opening line, e.g. `"1. e4 e5"`; empty for none.
    pub opening: String,
    /// Starting position as FEN; the standard position when `None`.
    pub start_fen: Option<String>,
    /// Delay after every move.
    pub pacing: Duration,
    /// Ply ceiling; reaching it is scored as a draw.
    pub max_plies: u32,
    pub tournament_id: Option<TournamentId>,
    /// Round number written into the transcript.
    pub round: Option<u32>,
}

impl MatchSpec {
    pub fn new(white: impl Into<String>, black: impl Into<String>) -> Self {
        Self {
            white: white.into(),
            black: black.into(),
            opening: String::new(),
            start_fen: None,
            pacing: Duration::ZERO,
            max_plies: DEFAULT_MAX_PLIES,
            tournament_id: None,
            round: None,
        }
    }

    pub fn with_opening(mut self, opening: impl Into<String>) -> Self {
        self.opening = opening.into();
        self
    }

    pub fn with_start_fen(mut self, fen: impl Into<String>) -> Self {
        self.start_fen = Some(fen.into());
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_max_plies(mut self, max_plies: u32) -> Self {
        self.max_plies = max_plies;
        self
    }

    pub fn in_tournament(mut self, id: TournamentId, round: u32) -> Self {
        self.tournament_id = Some(id);
        self.round = Some(round);
        self
    }

    fn start_position(&self) -> ArenaResult<Position> {
        match &self.start_fen {
            Some(fen) => Position::from_fen(fen),
            None => Ok(Position::startpos()),
        }
    }
}

/// Services a running match needs.
#[derive(Clone)]
pub struct MatchEnv {
    pub resolver: Arc<dyn SourceResolver>,
    pub sink: Arc<dyn RecordSink>,
    pub broadcaster: Arc<Broadcaster>,
}

struct Shared {
    snapshot: RwLock<MatchSnapshot>,
    stop: watch::Sender<bool>,
    done: watch::Sender<bool>,
}

impl Shared {
    fn read(&self) -> MatchSnapshot {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Mutate the snapshot and return a copy of the result.
    fn update(&self, f: impl FnOnce(&mut MatchSnapshot)) -> MatchSnapshot {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut snapshot);
        snapshot.updated_at = Utc::now();
        snapshot.clone()
    }
}

/// Handle to a running or completed match. Cheap to clone.
#[derive(Clone)]
pub struct MatchHandle {
    id: MatchId,
    shared: Arc<Shared>,
}

impl MatchHandle {
    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        self.shared.read()
    }

    pub fn status(&self) -> MatchStatus {
        self.shared
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Ask the match to halt at the next move boundary.
    ///
    /// Returns false if the match had already completed.
    pub fn stop(&self) -> bool {
        if self.is_done() {
            return false;
        }
        self.shared.stop.send_replace(true);
        true
    }

    /// True once the match has settled and everything downstream of it
    /// (persistence, final event) has happened.
    pub fn is_done(&self) -> bool {
        *self.shared.done.borrow()
    }

    /// Wait for completion and return the final snapshot.
    pub async fn wait(&self) -> MatchSnapshot {
        until_set(self.shared.done.subscribe()).await;
        self.snapshot()
    }
}

impl std::fmt::Debug for MatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

/// Resolve until the flag behind `rx` is set. Pends forever if the sender is
/// dropped without setting it.
pub(crate) async fn until_set(mut rx: watch::Receiver<bool>) {
    loop {
        let set = *rx.borrow_and_update();
        if set {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// A validated match whose game task has not been spawned yet.
///
/// Its handle already answers queries, so callers can register it before
/// [`PendingMatch::start`] announces the match.
pub struct PendingMatch {
    handle: MatchHandle,
    runner: Runner,
    start: Position,
    line: Vec<(Move, String)>,
}

impl PendingMatch {
    pub fn handle(&self) -> &MatchHandle {
        &self.handle
    }

    /// Broadcast `match_started` and spawn the game task.
    pub fn start(self) -> MatchHandle {
        let Self {
            handle,
            runner,
            start,
            line,
        } = self;
        let spec = &runner.spec;
        info!(match_id = %handle.id, white = %spec.white, black = %spec.black, opening = %spec.opening, "match started");
        runner.env.broadcaster.broadcast(&ArenaEvent::MatchStarted {
            match_id: handle.id,
            snapshot: handle.snapshot(),
        });
        tokio::spawn(runner.run(start, line));
        handle
    }
}

/// Validate `spec` and spawn the game task right away.
pub fn spawn_match(spec: MatchSpec, env: MatchEnv) -> ArenaResult<MatchHandle> {
    Ok(prepare_match(spec, env)?.start())
}

/// Validate `spec` and build its `Playing` snapshot without starting it.
///
/// Only the starting position and opening are checked here; participants
/// are resolved on the task, so an unplayable participant ends the match in
/// `Error` rather than failing the call.
pub fn prepare_match(spec: MatchSpec, env: MatchEnv) -> ArenaResult<PendingMatch> {
    let start = spec.start_position()?;
    let line = opening_line(&start, &spec.opening)?;

    let id = MatchId::new();
    let mut snapshot = MatchSnapshot::new(
        id,
        spec.white.clone(),
        spec.black.clone(),
        spec.opening.clone(),
        start.fen(),
        spec.tournament_id,
    );
    snapshot.transcript = render_transcript(&snapshot, spec.round);
    if snapshot.status.can_transition_to(MatchStatus::Playing) {
        snapshot.status = MatchStatus::Playing;
    }

    let (stop, _) = watch::channel(false);
    let (done, _) = watch::channel(false);
    let shared = Arc::new(Shared {
        snapshot: RwLock::new(snapshot),
        stop,
        done,
    });

    let runner = Runner {
        id,
        spec,
        env,
        shared: Arc::clone(&shared),
    };
    Ok(PendingMatch {
        handle: MatchHandle { id, shared },
        runner,
        start,
        line,
    })
}

/// Marks the match done when the game task ends, even by unwinding. A match
/// left non-terminal at that point becomes `Error`.
struct DoneGuard(Arc<Shared>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        let unsettled = !self
            .0
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
            .is_terminal();
        if unsettled {
            self.0.update(|s| {
                s.error = Some("match task ended unexpectedly".to_string());
                transition(s, MatchStatus::Error);
            });
        }
        self.0.done.send_replace(true);
    }
}

/// How the game loop ended.
enum Exit {
    Finished(Outcome),
    Stopped,
    Failed(String),
}

struct Runner {
    id: MatchId,
    spec: MatchSpec,
    env: MatchEnv,
    shared: Arc<Shared>,
}

impl Runner {
    async fn run(self, start: Position, line: Vec<(Move, String)>) {
        let _done = DoneGuard(Arc::clone(&self.shared));
        let exit = match AssertUnwindSafe(self.play(start, line)).catch_unwind().await {
            Ok(exit) => exit,
            Err(panic) => Exit::Failed(format!("move source panicked: {}", panic_message(&*panic))),
        };
        self.settle(exit).await;
    }

    async fn play(&self, start: Position, line: Vec<(Move, String)>) -> Exit {
        let mut white = match self.source(&self.spec.white, line.clone()) {
            Ok(source) => source,
            Err(e) => return Exit::Failed(e.to_string()),
        };
        let mut black = match self.source(&self.spec.black, line) {
            Ok(source) => source,
            Err(e) => return Exit::Failed(e.to_string()),
        };

        let mut position = start;
        let mut history: Vec<MoveRecord> = Vec::new();
        loop {
            if self.stop_requested() {
                return Exit::Stopped;
            }
            if let Some(outcome) = position.outcome() {
                return Exit::Finished(outcome);
            }
            if history.len() as u32 >= self.spec.max_plies {
                return Exit::Finished(Outcome {
                    result: GameResult::Draw,
                    termination: Termination::MoveLimit,
                });
            }

            let side = position.side_to_move();
            let source = match side {
                Side::White => &mut white,
                Side::Black => &mut black,
            };
            let proposal = tokio::select! {
                biased;
                _ = until_set(self.shared.stop.subscribe()) => return Exit::Stopped,
                proposal = source.next_move(&position, &history) => proposal,
            };
            let proposed = match proposal {
                Ok(Some(proposed)) => proposed,
                Ok(None) => {
                    info!(match_id = %self.id, participant = %self.spec_participant(side), "participant resigned");
                    return Exit::Finished(Outcome {
                        result: GameResult::win_for(side.other()),
                        termination: Termination::Resignation,
                    });
                }
                Err(e) => return Exit::Failed(e.to_string()),
            };

            let next = match position.apply(proposed.mv) {
                Ok(next) => next,
                Err(e) => return Exit::Failed(e.to_string()),
            };
            let san = match position.to_san(proposed.mv) {
                Ok(san) => san,
                Err(e) => return Exit::Failed(e.to_string()),
            };
            let (from, to) = position.move_squares(proposed.mv);
            let record = MoveRecord {
                ply: history.len() as u32 + 1,
                san,
                uci: position.to_uci(proposed.mv),
                side,
                actor: self.spec_participant(side).to_string(),
                origin: proposed.origin,
                from,
                to,
                explanation: proposed.explanation,
                fen_after: next.fen(),
            };
            debug!(match_id = %self.id, ply = record.ply, san = %record.san, origin = ?record.origin, "move played");

            position = next;
            history.push(record.clone());
            let round = self.spec.round;
            let snapshot = self.shared.update(|s| {
                s.moves.push(record);
                s.position = position.fen();
                s.transcript = render_transcript(s, round);
            });
            self.env.broadcaster.broadcast(&ArenaEvent::MoveMade {
                match_id: self.id,
                snapshot,
            });

            if !self.spec.pacing.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.spec.pacing) => {}
                    _ = until_set(self.shared.stop.subscribe()) => {}
                }
            }
        }
    }

    fn source(
        &self,
        participant: &str,
        line: Vec<(Move, String)>,
    ) -> ArenaResult<Box<dyn MoveSource>> {
        let inner = self.env.resolver.resolve(participant)?;
        if line.is_empty() {
            return Ok(inner);
        }
        Ok(Box::new(OpeningBook::from_line(line, inner)))
    }

    fn spec_participant(&self, side: Side) -> &str {
        match side {
            Side::White => &self.spec.white,
            Side::Black => &self.spec.black,
        }
    }

    fn stop_requested(&self) -> bool {
        *self.shared.stop.borrow()
    }

    /// Record the exit in the snapshot, persist finished games and announce
    /// the final state.
    async fn settle(&self, exit: Exit) {
        match exit {
            Exit::Finished(outcome) => {
                let round = self.spec.round;
                let mut snapshot = self.shared.update(|s| {
                    s.result = outcome.result;
                    s.termination = Some(outcome.termination);
                    s.transcript = render_transcript(s, round);
                    transition(s, MatchStatus::Finished);
                });
                info!(
                    match_id = %self.id,
                    white = %snapshot.white,
                    black = %snapshot.black,
                    result = snapshot.result.as_pgn(),
                    termination = outcome.termination.as_str(),
                    plies = snapshot.ply_count(),
                    "match finished"
                );

                if let Some(record) = snapshot.to_record() {
                    match self.env.sink.save_match_record(&record).await {
                        Ok(record_id) => {
                            snapshot = self.shared.update(|s| s.record_id = Some(record_id));
                        }
                        Err(e) => {
                            error!(match_id = %self.id, error = %e, "failed to persist match record");
                        }
                    }
                }
                self.env.broadcaster.broadcast(&ArenaEvent::MatchFinished {
                    match_id: self.id,
                    snapshot,
                });
            }
            Exit::Stopped => {
                let snapshot = self.shared.update(|s| {
                    transition(s, MatchStatus::Stopped);
                });
                info!(match_id = %self.id, plies = snapshot.ply_count(), "match stopped");
                self.env.broadcaster.broadcast(&ArenaEvent::MatchStopped {
                    match_id: self.id,
                    snapshot,
                });
            }
            Exit::Failed(message) => {
                let snapshot = self.shared.update(|s| {
                    s.error = Some(message.clone());
                    transition(s, MatchStatus::Error);
                });
                error!(match_id = %self.id, error = %message, "match failed");
                self.env.broadcaster.broadcast(&ArenaEvent::MatchError {
                    match_id: self.id,
                    message,
                    snapshot,
                });
            }
        }
    }
}

fn transition(snapshot: &mut MatchSnapshot, next: MatchStatus) {
    if snapshot.status.can_transition_to(next) {
        snapshot.status = next;
    } else {
        warn!(match_id = %snapshot.id, from = %snapshot.status, to = %next, "ignored status change");
    }
}

fn render_transcript(snapshot: &MatchSnapshot, round: Option<u32>) -> String {
    Transcript {
        date: snapshot.created_at,
        round,
        opening: Some(snapshot.opening.as_str()),
        result: snapshot.result,
        termination: snapshot.termination,
        start_fen: Some(snapshot.start_fen.as_str()),
        ..Transcript::new(&snapshot.white, &snapshot.black, &snapshot.moves)
    }
    .render()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "match_runner_tests.rs"]
mod match_runner_tests;
