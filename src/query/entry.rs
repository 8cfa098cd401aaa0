use tokio::time::Instant;

use super::error::QueryError;
use super::key::QueryKey;
use crate::model::ListResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Fetching,
    Error,
}

/// Read-only view of one cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: QueryKey,
    /// Last successful result, possibly patched optimistically since.
    pub data: Option<ListResult>,
    /// When `data` was last committed by a fetch.
    pub fetched_at: Option<Instant>,
    pub status: FetchStatus,
    /// The failure of the latest fetch, while `status` is `Error`.
    pub error: Option<QueryError>,
    /// Marked stale by `invalidate`; the next read refetches.
    pub invalidated: bool,
}

/// Captured data of a set of entries, restorable with `QueryCache::restore`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheSnapshot {
    pub(crate) entries: Vec<(QueryKey, Option<ListResult>)>,
}

impl CacheSnapshot {
    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn get(&self, key: &QueryKey) -> Option<&ListResult> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .and_then(|(_, data)| data.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply `updater` to every captured result, as `QueryCache::patch`
    /// would have done to the live entries.
    pub(crate) fn patch<F>(&mut self, mut updater: F)
    where
        F: FnMut(&mut ListResult),
    {
        for (_, data) in self.entries.iter_mut() {
            if let Some(data) = data {
                updater(data);
            }
        }
    }
}

/// Notification sent to cache subscribers after a committed change.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// A fetch was issued for the key.
    Fetching(QueryKey),
    /// A fetch committed fresh data.
    Updated(QueryKey),
    /// The latest fetch failed; earlier data, if any, stays.
    Failed(QueryKey),
    /// Optimistic write applied to these keys.
    Patched(Vec<QueryKey>),
    /// Snapshot written back to these keys.
    Restored(Vec<QueryKey>),
    /// These keys were marked stale.
    Invalidated(Vec<QueryKey>),
    /// In-flight fetches for these keys lost relevance.
    Cancelled(Vec<QueryKey>),
    Suspended,
    Resumed,
}
