//! Round-robin tournament scheduler.
//!
//! Every ordered pairing of participants plays `games_per_pair` consecutive
//! games with fixed colours. Pairings run strictly one after another, each
//! game launched through a [`MatchLauncher`] so it is registered and
//! observable like any other match.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use arena_core::{
    build_schedule, validate_participants, ArenaResult, GameResult, MatchStatus, Position,
    ScheduledGame, Standings, TieBreak, TournamentGame, TournamentId, TournamentSnapshot,
    TournamentStatus,
};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::broadcast::Broadcaster;
use crate::event::ArenaEvent;
use crate::match_runner::{until_set, MatchHandle, MatchSpec};
use crate::settings::ArenaSettings;
use crate::source::opening_line;

/// Starts matches on behalf of the scheduler.
pub trait MatchLauncher: Send + Sync {
    fn launch(&self, spec: MatchSpec) -> ArenaResult<MatchHandle>;
}

/// How every game of a tournament is played.
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentSpec {
    pub participants: Vec<String>,
    pub games_per_pair: u32,
    pub opening: String,
    pub pacing: Duration,
    pub max_plies: u32,
    pub tie_break: TieBreak,
}

impl TournamentSpec {
    /// Spec with game settings taken from `settings`.
    pub fn new(participants: Vec<String>, games_per_pair: u32, settings: &ArenaSettings) -> Self {
        Self {
            participants,
            games_per_pair,
            opening: settings.tournament_opening.clone(),
            pacing: settings.tournament_pacing(),
            max_plies: settings.max_plies,
            tie_break: settings.tie_break,
        }
    }

    pub fn with_opening(mut self, opening: impl Into<String>) -> Self {
        self.opening = opening.into();
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Reject bad participant lists and openings before anything runs.
    pub fn validate(&self) -> ArenaResult<()> {
        validate_participants(&self.participants, self.games_per_pair)?;
        opening_line(&Position::startpos(), &self.opening)?;
        Ok(())
    }

    fn match_spec(&self, id: TournamentId, game: &ScheduledGame, round: u32) -> MatchSpec {
        MatchSpec::new(game.white.clone(), game.black.clone())
            .with_opening(self.opening.clone())
            .with_pacing(self.pacing)
            .with_max_plies(self.max_plies)
            .in_tournament(id, round)
    }
}

struct Shared {
    snapshot: RwLock<TournamentSnapshot>,
    stop: watch::Sender<bool>,
    done: watch::Sender<bool>,
}

impl Shared {
    fn update(&self, f: impl FnOnce(&mut TournamentSnapshot)) -> TournamentSnapshot {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut snapshot);
        snapshot.updated_at = Utc::now();
        snapshot.clone()
    }
}

/// Handle to a running or completed tournament. Cheap to clone.
#[derive(Clone)]
pub struct TournamentHandle {
    id: TournamentId,
    shared: Arc<Shared>,
}

impl TournamentHandle {
    pub fn id(&self) -> TournamentId {
        self.id
    }

    pub fn snapshot(&self) -> TournamentSnapshot {
        self.shared
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> TournamentStatus {
        self.shared
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Stop before the next pairing starts. The game in progress and the
    /// rest of its pairing are played out.
    pub fn stop(&self) -> bool {
        if self.is_done() {
            return false;
        }
        self.shared.stop.send_replace(true);
        true
    }

    pub fn is_done(&self) -> bool {
        *self.shared.done.borrow()
    }

    pub async fn wait(&self) -> TournamentSnapshot {
        until_set(self.shared.done.subscribe()).await;
        self.snapshot()
    }
}

impl std::fmt::Debug for TournamentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TournamentHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

/// A validated tournament whose scheduler task has not been spawned yet.
pub struct PendingTournament {
    handle: TournamentHandle,
    scheduler: Scheduler,
}

impl PendingTournament {
    pub fn handle(&self) -> &TournamentHandle {
        &self.handle
    }

    /// Broadcast `tournament_started` and spawn the scheduler task.
    pub fn start(self) -> TournamentHandle {
        let Self { handle, scheduler } = self;
        let snapshot = handle.snapshot();
        info!(
            tournament_id = %handle.id,
            participants = snapshot.participants.len(),
            games = snapshot.total_games,
            "tournament started"
        );
        scheduler.broadcaster.broadcast(&ArenaEvent::TournamentStarted {
            tournament_id: handle.id,
            snapshot,
        });
        tokio::spawn(scheduler.run());
        handle
    }
}

/// Validate `spec` and start the scheduler task right away.
pub fn spawn_tournament(
    spec: TournamentSpec,
    launcher: Arc<dyn MatchLauncher>,
    broadcaster: Arc<Broadcaster>,
) -> ArenaResult<TournamentHandle> {
    Ok(prepare_tournament(spec, launcher, broadcaster)?.start())
}

/// Validate `spec` and build its schedule without starting it.
pub fn prepare_tournament(
    spec: TournamentSpec,
    launcher: Arc<dyn MatchLauncher>,
    broadcaster: Arc<Broadcaster>,
) -> ArenaResult<PendingTournament> {
    spec.validate()?;

    let id = TournamentId::new();
    let standings = Standings::new(&spec.participants);
    let mut snapshot = TournamentSnapshot::new(id, spec.participants.clone(), spec.games_per_pair);
    snapshot.standings = standings.sorted(spec.tie_break);

    let (stop, _) = watch::channel(false);
    let (done, _) = watch::channel(false);
    let shared = Arc::new(Shared {
        snapshot: RwLock::new(snapshot),
        stop,
        done,
    });

    let scheduler = Scheduler {
        id,
        spec,
        launcher,
        broadcaster,
        shared: Arc::clone(&shared),
        standings,
    };
    Ok(PendingTournament {
        handle: TournamentHandle { id, shared },
        scheduler,
    })
}

/// Marks the tournament done when the scheduler task ends, even by
/// unwinding. A tournament still playing at that point becomes `Stopped`.
struct DoneGuard(Arc<Shared>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        let playing = !self
            .0
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
            .is_terminal();
        if playing {
            let snapshot = self.0.update(|s| s.status = TournamentStatus::Stopped);
            error!(tournament_id = %snapshot.id, "tournament scheduler ended unexpectedly");
        }
        self.0.done.send_replace(true);
    }
}

struct Scheduler {
    id: TournamentId,
    spec: TournamentSpec,
    launcher: Arc<dyn MatchLauncher>,
    broadcaster: Arc<Broadcaster>,
    shared: Arc<Shared>,
    standings: Standings,
}

impl Scheduler {
    async fn run(mut self) {
        let _done = DoneGuard(Arc::clone(&self.shared));
        let pairings = self.shared.snapshot.read().unwrap_or_else(PoisonError::into_inner).pairings.clone();
        let schedule = build_schedule(&pairings, self.spec.games_per_pair);

        let mut stopped = false;
        for (pairing_index, pairing) in pairings.iter().enumerate() {
            if *self.shared.stop.borrow() {
                stopped = true;
                break;
            }
            self.shared.update(|s| s.current_pairing = pairing_index);
            info!(
                tournament_id = %self.id,
                pairing = pairing_index + 1,
                of = pairings.len(),
                white = %pairing.white,
                black = %pairing.black,
                "pairing started"
            );

            let games: Vec<(usize, &ScheduledGame)> = schedule
                .iter()
                .enumerate()
                .filter(|(_, game)| game.pairing_index == pairing_index)
                .collect();
            let mut results = Vec::with_capacity(games.len());
            for (position, (round, game)) in games.iter().enumerate() {
                let played = self.play(game, *round as u32 + 1).await;
                results.push((game, played.as_ref().map(|g| g.result).unwrap_or_default()));

                let last_of_pairing = position + 1 == games.len();
                if last_of_pairing {
                    for (game, result) in results.drain(..) {
                        self.standings.record(&game.white, &game.black, result);
                    }
                }
                let standings = last_of_pairing.then(|| self.standings.sorted(self.spec.tie_break));
                let snapshot = self.shared.update(|s| {
                    if let Some(game) = played {
                        s.games.push(game);
                    }
                    if let Some(standings) = standings {
                        s.standings = standings;
                        s.completed_pairings += 1;
                    }
                });
                self.broadcaster.broadcast(&ArenaEvent::TournamentUpdated {
                    tournament_id: self.id,
                    snapshot,
                });
            }
        }

        let status = if stopped {
            TournamentStatus::Stopped
        } else {
            TournamentStatus::Finished
        };
        let snapshot = self.shared.update(|s| s.status = status);
        let event = if stopped {
            info!(tournament_id = %self.id, games = snapshot.completed_games(), "tournament stopped");
            ArenaEvent::TournamentStopped {
                tournament_id: self.id,
                snapshot,
            }
        } else {
            info!(tournament_id = %self.id, games = snapshot.completed_games(), "tournament finished");
            ArenaEvent::TournamentFinished {
                tournament_id: self.id,
                snapshot,
            }
        };
        self.broadcaster.broadcast(&event);
    }

    /// Launch one game and wait for it. `None` if it could not be started.
    async fn play(&self, game: &ScheduledGame, round: u32) -> Option<TournamentGame> {
        let spec = self.spec.match_spec(self.id, game, round);
        let handle = match self.launcher.launch(spec) {
            Ok(handle) => handle,
            Err(e) => {
                error!(tournament_id = %self.id, white = %game.white, black = %game.black, error = %e, "failed to launch game");
                return None;
            }
        };
        self.shared.update(|s| s.match_ids.push(handle.id()));

        let snapshot = handle.wait().await;
        if snapshot.status != MatchStatus::Finished {
            info!(tournament_id = %self.id, match_id = %handle.id(), status = %snapshot.status, "game ended without a result");
        }
        Some(TournamentGame {
            match_id: handle.id(),
            pairing_index: game.pairing_index,
            game: game.game,
            white: game.white.clone(),
            black: game.black.clone(),
            status: snapshot.status,
            result: match snapshot.status {
                MatchStatus::Finished => snapshot.result,
                _ => GameResult::Undetermined,
            },
        })
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
