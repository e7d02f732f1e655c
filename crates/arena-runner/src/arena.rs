//! The arena: owns the registries, the broadcaster and the record sink, and
//! is the one entry point for starting, observing and stopping play.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arena_core::{
    ArenaError, ArenaResult, HistoryFilter, MatchId, MatchSnapshot, RatingEngine, RatingTable,
    TournamentId, TournamentSnapshot,
};
use futures::future::join_all;
use tracing::info;

use crate::broadcast::{Broadcaster, EventSink, SubscriberId, Subscription};
use crate::match_runner::{prepare_match, MatchEnv, MatchHandle, MatchSpec};
use crate::registry::Registry;
use crate::scheduler::{prepare_tournament, MatchLauncher, TournamentHandle, TournamentSpec};
use crate::settings::ArenaSettings;
use crate::source::SourceResolver;
use crate::store::{MemorySink, RecordSink};

struct Inner {
    settings: ArenaSettings,
    env: MatchEnv,
    matches: Registry<MatchHandle>,
    tournaments: Registry<TournamentHandle>,
    closing: AtomicBool,
}

impl MatchLauncher for Inner {
    fn launch(&self, spec: MatchSpec) -> ArenaResult<MatchHandle> {
        if self.closing.load(Ordering::Acquire) {
            return Err(ArenaError::source_unavailable(spec.white, "arena is shutting down"));
        }
        // Registered before the start event goes out, so subscribers can look it up.
        let pending = prepare_match(spec, self.env.clone())?;
        self.matches.create(pending.handle().clone());
        Ok(pending.start())
    }
}

/// Match and tournament orchestration.
///
/// Cloning is cheap and every clone drives the same arena. Must be used from
/// within a tokio runtime.
#[derive(Clone)]
pub struct Arena {
    inner: Arc<Inner>,
}

impl Arena {
    pub fn new(
        settings: ArenaSettings,
        resolver: Arc<dyn SourceResolver>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                env: MatchEnv {
                    resolver,
                    sink,
                    broadcaster: Arc::new(Broadcaster::new()),
                },
                matches: Registry::new(),
                tournaments: Registry::new(),
                closing: AtomicBool::new(false),
            }),
        }
    }

    /// Arena with default settings that keeps records in memory.
    pub fn in_memory(resolver: Arc<dyn SourceResolver>) -> Self {
        Self::new(ArenaSettings::default(), resolver, Arc::new(MemorySink::new()))
    }

    pub fn settings(&self) -> &ArenaSettings {
        &self.inner.settings
    }

    pub fn sink(&self) -> &Arc<dyn RecordSink> {
        &self.inner.env.sink
    }

    /// Start a game from the standard position.
    ///
    /// The opening is checked before anything is spawned; a bad line fails
    /// with `InvalidNotation`.
    pub fn start_match(
        &self,
        white: &str,
        black: &str,
        opening: &str,
        pacing: Duration,
    ) -> ArenaResult<MatchId> {
        let spec = MatchSpec::new(white, black)
            .with_opening(opening)
            .with_pacing(pacing)
            .with_max_plies(self.inner.settings.max_plies);
        self.start_match_with(spec)
    }

    pub fn start_match_with(&self, spec: MatchSpec) -> ArenaResult<MatchId> {
        Ok(self.inner.launch(spec)?.id())
    }

    pub fn match_status(&self, id: MatchId) -> ArenaResult<MatchSnapshot> {
        self.inner.matches.get(id)
    }

    pub fn list_matches(&self) -> Vec<MatchSnapshot> {
        self.inner.matches.list()
    }

    /// Request a cooperative stop; the match halts at its next move boundary.
    pub fn stop_match(&self, id: MatchId) -> ArenaResult<()> {
        let handle = self.inner.matches.handle(id)?;
        if handle.stop() {
            info!(match_id = %id, "stop requested");
        }
        Ok(())
    }

    /// Forget a match, stopping it first if it is still running.
    pub fn remove_match(&self, id: MatchId) -> ArenaResult<MatchSnapshot> {
        let handle = self.inner.matches.remove(id)?;
        handle.stop();
        Ok(handle.snapshot())
    }

    /// Wait until the match has settled and return its final snapshot.
    pub async fn wait_for_match(&self, id: MatchId) -> ArenaResult<MatchSnapshot> {
        let handle = self.inner.matches.handle(id)?;
        Ok(handle.wait().await)
    }

    /// Start a round robin with the configured opening, pacing and tie-break.
    pub fn start_tournament(
        &self,
        participants: Vec<String>,
        games_per_pair: u32,
    ) -> ArenaResult<TournamentId> {
        let spec = TournamentSpec::new(participants, games_per_pair, &self.inner.settings);
        self.start_tournament_with(spec)
    }

    pub fn start_tournament_with(&self, spec: TournamentSpec) -> ArenaResult<TournamentId> {
        let launcher: Arc<dyn MatchLauncher> = self.inner.clone();
        let pending =
            prepare_tournament(spec, launcher, Arc::clone(&self.inner.env.broadcaster))?;
        let id = self.inner.tournaments.create(pending.handle().clone());
        pending.start();
        Ok(id)
    }

    pub fn tournament_status(&self, id: TournamentId) -> ArenaResult<TournamentSnapshot> {
        self.inner.tournaments.get(id)
    }

    pub fn list_tournaments(&self) -> Vec<TournamentSnapshot> {
        self.inner.tournaments.list()
    }

    /// Stop the tournament before its next pairing.
    pub fn stop_tournament(&self, id: TournamentId) -> ArenaResult<()> {
        let handle = self.inner.tournaments.handle(id)?;
        if handle.stop() {
            info!(tournament_id = %id, "stop requested");
        }
        Ok(())
    }

    /// Forget a tournament, stopping it first if it is still running. Its
    /// games stay registered as matches.
    pub fn remove_tournament(&self, id: TournamentId) -> ArenaResult<TournamentSnapshot> {
        let handle = self.inner.tournaments.remove(id)?;
        handle.stop();
        Ok(handle.snapshot())
    }

    pub async fn wait_for_tournament(&self, id: TournamentId) -> ArenaResult<TournamentSnapshot> {
        let handle = self.inner.tournaments.handle(id)?;
        Ok(handle.wait().await)
    }

    pub fn subscribe(&self) -> Subscription {
        self.inner.env.broadcaster.subscribe()
    }

    pub fn attach_sink(&self, sink: impl EventSink + 'static) -> SubscriberId {
        self.inner.env.broadcaster.attach(sink)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.env.broadcaster.unsubscribe(id)
    }

    /// Recompute ratings from persisted history.
    pub async fn recompute_ratings(&self, filter: &HistoryFilter) -> ArenaResult<RatingTable> {
        let records = self.inner.env.sink.load_match_history(filter).await?;
        let table = RatingEngine::new(self.inner.settings.rating.clone()).compute(&records);
        info!(records = records.len(), models = table.ratings.len(), "ratings recomputed");
        Ok(table)
    }

    /// Stop every tournament and match, wait for them to settle and close all
    /// subscriptions. No new matches start once this is called.
    pub async fn shutdown(&self) {
        self.inner.closing.store(true, Ordering::Release);
        let tournaments = self.inner.tournaments.handles();
        for handle in &tournaments {
            handle.stop();
        }
        let matches = self.inner.matches.handles();
        for handle in &matches {
            handle.stop();
        }
        join_all(tournaments.iter().map(|h| h.wait())).await;
        join_all(matches.iter().map(|h| h.wait())).await;
        self.inner.env.broadcaster.close();
        info!(matches = matches.len(), tournaments = tournaments.len(), "arena shut down");
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("matches", &self.inner.matches.len())
            .field("tournaments", &self.inner.tournaments.len())
            .finish()
    }
}
