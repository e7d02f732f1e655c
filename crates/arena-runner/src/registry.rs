//! Keyed store of live match and tournament handles.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use arena_core::{ArenaError, ArenaResult, MatchId, MatchSnapshot, TournamentId, TournamentSnapshot};

use crate::match_runner::MatchHandle;
use crate::scheduler::TournamentHandle;

/// Something the registry can track: a cloneable handle that can produce an
/// owned snapshot of its state.
pub trait Tracked: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + Display + Send + Sync;
    type Snapshot;

    fn id(&self) -> Self::Id;
    fn snapshot(&self) -> Self::Snapshot;
    fn not_found(id: Self::Id) -> ArenaError;
}

impl Tracked for MatchHandle {
    type Id = MatchId;
    type Snapshot = MatchSnapshot;

    fn id(&self) -> MatchId {
        MatchHandle::id(self)
    }

    fn snapshot(&self) -> MatchSnapshot {
        MatchHandle::snapshot(self)
    }

    fn not_found(id: MatchId) -> ArenaError {
        ArenaError::MatchNotFound(id)
    }
}

impl Tracked for TournamentHandle {
    type Id = TournamentId;
    type Snapshot = TournamentSnapshot;

    fn id(&self) -> TournamentId {
        TournamentHandle::id(self)
    }

    fn snapshot(&self) -> TournamentSnapshot {
        TournamentHandle::snapshot(self)
    }

    fn not_found(id: TournamentId) -> ArenaError {
        ArenaError::TournamentNotFound(id)
    }
}

struct Entries<H: Tracked> {
    by_id: HashMap<H::Id, H>,
    /// Insertion order, for stable listings.
    order: Vec<H::Id>,
}

/// Concurrent map from id to handle.
///
/// The map lock only guards the lookup; snapshots are taken from the cloned
/// handle after it is released.
pub struct Registry<H: Tracked> {
    entries: Mutex<Entries<H>>,
}

impl<H: Tracked> Registry<H> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries {
                by_id: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Track `handle`, replacing any handle with the same id.
    pub fn create(&self, handle: H) -> H::Id {
        let id = handle.id();
        let mut entries = self.lock();
        if entries.by_id.insert(id, handle).is_none() {
            entries.order.push(id);
        }
        id
    }

    pub fn handle(&self, id: H::Id) -> ArenaResult<H> {
        self.lock().by_id.get(&id).cloned().ok_or_else(|| H::not_found(id))
    }

    pub fn get(&self, id: H::Id) -> ArenaResult<H::Snapshot> {
        Ok(self.handle(id)?.snapshot())
    }

    pub fn contains(&self, id: H::Id) -> bool {
        self.lock().by_id.contains_key(&id)
    }

    /// Every tracked handle, oldest first.
    pub fn handles(&self) -> Vec<H> {
        let entries = self.lock();
        entries
            .order
            .iter()
            .filter_map(|id| entries.by_id.get(id).cloned())
            .collect()
    }

    /// Snapshots of every tracked item, oldest first.
    pub fn list(&self) -> Vec<H::Snapshot> {
        self.handles().iter().map(Tracked::snapshot).collect()
    }

    pub fn remove(&self, id: H::Id) -> ArenaResult<H> {
        let mut entries = self.lock();
        let handle = entries.by_id.remove(&id).ok_or_else(|| H::not_found(id))?;
        entries.order.retain(|other| *other != id);
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Entries<H>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: Tracked> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
