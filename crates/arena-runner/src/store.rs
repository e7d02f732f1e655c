//! Persistence sink for finished matches.

use std::sync::{Mutex, PoisonError};

use arena_core::{ArenaError, ArenaResult, HistoryFilter, MatchRecord, RecordId};
use async_trait::async_trait;

/// Destination for finished match records.
///
/// Implementations must tolerate concurrent calls; the runner never holds a
/// lock while awaiting them.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Store a record and return the id it was assigned.
    async fn save_match_record(&self, record: &MatchRecord) -> ArenaResult<RecordId>;

    /// Stored records matching `filter`, oldest first.
    async fn load_match_history(&self, filter: &HistoryFilter) -> ArenaResult<Vec<MatchRecord>>;
}

/// In-process sink; ids start at 1 like an SQLite rowid.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<MatchRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<MatchRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn save_match_record(&self, record: &MatchRecord) -> ArenaResult<RecordId> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let id = records.len() as RecordId + 1;
        let mut stored = record.clone();
        stored.id = Some(id);
        records.push(stored);
        Ok(id)
    }

    async fn load_match_history(&self, filter: &HistoryFilter) -> ArenaResult<Vec<MatchRecord>> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(filter.apply(records))
    }
}

/// Sink that rejects every write. Useful when persistence is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSink;

#[async_trait]
impl RecordSink for DisabledSink {
    async fn save_match_record(&self, _record: &MatchRecord) -> ArenaResult<RecordId> {
        Err(ArenaError::Persistence("persistence is disabled".to_string()))
    }

    async fn load_match_history(&self, _filter: &HistoryFilter) -> ArenaResult<Vec<MatchRecord>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
