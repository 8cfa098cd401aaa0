//! QueryCache - list results keyed by normalized query parameters.
//!
//! All writes go through `request`/`refetch` (fetch commits) or
//! `patch`/`restore` (optimistic writes and rollback). Each write happens
//! under a single lock acquisition, so no reader sees a half-applied change,
//! and subscribers are notified after the lock is released.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::entry::{CacheEntry, CacheEvent, CacheSnapshot, FetchStatus};
use super::error::QueryError;
use super::key::QueryKey;
use crate::api::ApiError;
use crate::emitter::{Emitter, SubscriptionId};
use crate::model::ListResult;

/// Outcome shared with every caller awaiting the same fetch.
type Settled = Option<Result<ListResult, QueryError>>;

/// Predicate matching every key; all cached queries are list queries.
pub fn all_lists(_: &QueryKey) -> bool {
    true
}

struct InFlight {
    generation: u64,
    settled: watch::Receiver<Settled>,
}

#[derive(Default)]
struct Slot {
    data: Option<ListResult>,
    fetched_at: Option<Instant>,
    status: FetchStatus,
    error: Option<QueryError>,
    invalidated: bool,
    in_flight: Option<InFlight>,
}

impl Slot {
    fn fresh_data(&self, now: Instant, stale_time: Option<Duration>) -> Option<&ListResult> {
        if self.invalidated {
            return None;
        }
        let data = self.data.as_ref()?;
        let fresh = match (stale_time, self.fetched_at) {
            (None, _) => true,
            (Some(stale_time), Some(fetched_at)) => now.duration_since(fetched_at) < stale_time,
            (Some(_), None) => false,
        };
        fresh.then_some(data)
    }

    fn in_flight_generation(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|in_flight| in_flight.generation)
    }

    /// Drop relevance of the in-flight fetch and fall back to the status it
    /// replaced.
    fn release_in_flight(&mut self) -> bool {
        if self.in_flight.take().is_none() {
            return false;
        }
        self.status = if self.error.is_some() {
            FetchStatus::Error
        } else {
            FetchStatus::Idle
        };
        true
    }

    fn view(&self, key: &QueryKey) -> CacheEntry {
        CacheEntry {
            key: key.clone(),
            data: self.data.clone(),
            fetched_at: self.fetched_at,
            status: self.status,
            error: self.error.clone(),
            invalidated: self.invalidated,
        }
    }
}

struct CacheState {
    slots: HashMap<QueryKey, Slot>,
    next_generation: u64,
    suspended: bool,
}

enum Plan {
    Cached(ListResult),
    Join(watch::Receiver<Settled>),
    Fetch(FetchTicket),
}

/// Issuer's side of an in-flight fetch. Dropping it before it settles (the
/// issuing future was dropped) frees the slot; joined callers then see
/// `QueryError::Cancelled`.
struct FetchTicket {
    state: Arc<Mutex<CacheState>>,
    key: QueryKey,
    generation: u64,
    sender: watch::Sender<Settled>,
    settled: bool,
}

impl FetchTicket {
    fn settle(&mut self, result: Result<ListResult, QueryError>) {
        self.settled = true;
        self.sender.send_replace(Some(result));
    }
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock();
        if let Some(slot) = state.slots.get_mut(&self.key) {
            if slot.in_flight_generation() == Some(self.generation) {
                slot.release_in_flight();
                debug!(key = %self.key, generation = self.generation, "fetch abandoned by issuer");
            }
        }
    }
}

/// Query/result cache shared by the list view and the mutation coordinator.
///
/// Clone-friendly: clones share the same entries and subscribers.
#[derive(Clone)]
pub struct QueryCache {
    state: Arc<Mutex<CacheState>>,
    events: Emitter<CacheEvent>,
    stale_time: Option<Duration>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        QueryCache {
            state: Arc::new(Mutex::new(CacheState {
                slots: HashMap::new(),
                next_generation: 0,
                suspended: false,
            })),
            events: Emitter::new(),
            stale_time: None,
        }
    }

    /// Treat entries older than `stale_time` as stale on the next read.
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.state.lock().slots.get(key).map(|slot| slot.view(key))
    }

    pub fn data(&self, key: &QueryKey) -> Option<ListResult> {
        self.state
            .lock()
            .slots
            .get(key)
            .and_then(|slot| slot.data.clone())
    }

    /// Every entry, ordered by key for stable comparison.
    pub fn entries(&self) -> Vec<CacheEntry> {
        let state = self.state.lock();
        let mut entries: Vec<CacheEntry> = state
            .slots
            .iter()
            .map(|(key, slot)| slot.view(key))
            .collect();
        entries.sort_by_key(|entry| entry.key.to_string());
        entries
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.state
            .lock()
            .slots
            .get(key)
            .is_some_and(|slot| slot.in_flight.is_some())
    }

    pub fn is_suspended(&self) -> bool {
        self.state.lock().suspended
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.events.on(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    /// Read through the cache.
    ///
    /// Returns the cached result when it is present and fresh. If a fetch for
    /// `key` is already in flight, waits for it instead of issuing another.
    /// Otherwise calls `fetcher` and commits its result, unless the fetch
    /// lost relevance in the meantime (superseded, cancelled, or the cache
    /// was suspended), in which case `QueryError::Cancelled` is returned and
    /// nothing is written.
    pub async fn request<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<ListResult, QueryError>
    where
        F: FnOnce(QueryKey) -> Fut,
        Fut: Future<Output = Result<ListResult, ApiError>>,
    {
        let plan = {
            let mut state = self.state.lock();
            if state.suspended {
                return Err(QueryError::Suspended);
            }
            let now = Instant::now();
            let existing = state.slots.get(key).map(|slot| {
                (
                    slot.fresh_data(now, self.stale_time).cloned(),
                    slot.in_flight.as_ref().map(|f| f.settled.clone()),
                )
            });
            match existing {
                Some((Some(data), _)) => Plan::Cached(data),
                Some((None, Some(settled))) => Plan::Join(settled),
                _ => Plan::Fetch(self.issue(&mut state, key)),
            }
        };

        match plan {
            Plan::Cached(data) => {
                debug!(key = %key, "cache hit");
                Ok(data)
            }
            Plan::Join(settled) => {
                debug!(key = %key, "joining in-flight fetch");
                Self::join(settled).await
            }
            Plan::Fetch(ticket) => self.run(ticket, fetcher).await,
        }
    }

    /// Always issue a new fetch for `key`. A fetch already in flight for the
    /// key is superseded: its result will be dropped.
    pub async fn refetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<ListResult, QueryError>
    where
        F: FnOnce(QueryKey) -> Fut,
        Fut: Future<Output = Result<ListResult, ApiError>>,
    {
        let ticket = {
            let mut state = self.state.lock();
            if state.suspended {
                return Err(QueryError::Suspended);
            }
            self.issue(&mut state, key)
        };
        self.run(ticket, fetcher).await
    }

    /// Mark matching entries stale. Their data stays readable through `get`
    /// but the next `request` refetches.
    pub fn invalidate(&self, predicate: &dyn Fn(&QueryKey) -> bool) -> Vec<QueryKey> {
        let (keys, event) = self.invalidate_deferred(predicate);
        self.notify(event);
        keys
    }

    /// Drop relevance of in-flight fetches for matching keys. Their results
    /// will never be committed.
    pub fn cancel(&self, predicate: &dyn Fn(&QueryKey) -> bool) -> Vec<QueryKey> {
        let (keys, event) = self.cancel_deferred(predicate);
        self.notify(event);
        keys
    }

    /// Transform the data of every matching entry in place. Fetch
    /// timestamps and staleness are left alone.
    pub fn patch<F>(&self, predicate: &dyn Fn(&QueryKey) -> bool, updater: F) -> Vec<QueryKey>
    where
        F: FnMut(&mut ListResult),
    {
        let (keys, event) = self.patch_deferred(predicate, updater);
        self.notify(event);
        keys
    }

    /// Capture the data of every matching entry that has data.
    pub fn snapshot(&self, predicate: &dyn Fn(&QueryKey) -> bool) -> CacheSnapshot {
        let state = self.state.lock();
        let mut entries: Vec<(QueryKey, Option<ListResult>)> = state
            .slots
            .iter()
            .filter(|(key, slot)| slot.data.is_some() && predicate(key))
            .map(|(key, slot)| (key.clone(), slot.data.clone()))
            .collect();
        entries.sort_by_key(|(key, _)| key.to_string());
        CacheSnapshot { entries }
    }

    /// Write captured data back, exactly as it was captured.
    pub fn restore(&self, snapshot: &CacheSnapshot) {
        let event = self.restore_deferred(snapshot);
        self.notify(event);
    }

    /// Stop all cache activity: in-flight fetches are cancelled and new
    /// reads fail with `QueryError::Suspended` until `resume`.
    pub fn suspend(&self) {
        {
            let mut state = self.state.lock();
            if state.suspended {
                return;
            }
            state.suspended = true;
            for slot in state.slots.values_mut() {
                slot.release_in_flight();
            }
        }
        warn!("query cache suspended");
        self.events.emit(&CacheEvent::Suspended);
    }

    pub fn resume(&self) {
        {
            let mut state = self.state.lock();
            if !state.suspended {
                return;
            }
            state.suspended = false;
        }
        debug!("query cache resumed");
        self.events.emit(&CacheEvent::Resumed);
    }

    // ========================================================================
    // Deferred writes: apply now, notify later
    // ========================================================================
    //
    // Callers that hold their own lock across several cache writes use these
    // and pass the returned events to `notify` once that lock is released.

    pub(crate) fn invalidate_deferred(
        &self,
        predicate: &dyn Fn(&QueryKey) -> bool,
    ) -> (Vec<QueryKey>, Option<CacheEvent>) {
        let keys: Vec<QueryKey> = {
            let mut state = self.state.lock();
            state
                .slots
                .iter_mut()
                .filter(|(key, _)| predicate(key))
                .map(|(key, slot)| {
                    slot.invalidated = true;
                    key.clone()
                })
                .collect()
        };
        if keys.is_empty() {
            return (keys, None);
        }
        debug!(count = keys.len(), "invalidated queries");
        let event = CacheEvent::Invalidated(keys.clone());
        (keys, Some(event))
    }

    pub(crate) fn cancel_deferred(
        &self,
        predicate: &dyn Fn(&QueryKey) -> bool,
    ) -> (Vec<QueryKey>, Option<CacheEvent>) {
        let keys: Vec<QueryKey> = {
            let mut state = self.state.lock();
            state
                .slots
                .iter_mut()
                .filter(|(key, _)| predicate(key))
                .filter_map(|(key, slot)| slot.release_in_flight().then(|| key.clone()))
                .collect()
        };
        if keys.is_empty() {
            return (keys, None);
        }
        debug!(count = keys.len(), "cancelled in-flight fetches");
        let event = CacheEvent::Cancelled(keys.clone());
        (keys, Some(event))
    }

    pub(crate) fn patch_deferred<F>(
        &self,
        predicate: &dyn Fn(&QueryKey) -> bool,
        mut updater: F,
    ) -> (Vec<QueryKey>, Option<CacheEvent>)
    where
        F: FnMut(&mut ListResult),
    {
        let keys: Vec<QueryKey> = {
            let mut state = self.state.lock();
            state
                .slots
                .iter_mut()
                .filter(|(key, _)| predicate(key))
                .filter_map(|(key, slot)| {
                    let data = slot.data.as_mut()?;
                    updater(data);
                    Some(key.clone())
                })
                .collect()
        };
        if keys.is_empty() {
            return (keys, None);
        }
        let event = CacheEvent::Patched(keys.clone());
        (keys, Some(event))
    }

    pub(crate) fn restore_deferred(&self, snapshot: &CacheSnapshot) -> Option<CacheEvent> {
        if snapshot.is_empty() {
            return None;
        }
        let mut state = self.state.lock();
        for (key, data) in &snapshot.entries {
            state.slots.entry(key.clone()).or_default().data = data.clone();
        }
        Some(CacheEvent::Restored(snapshot.keys().cloned().collect()))
    }

    pub(crate) fn notify(&self, events: impl IntoIterator<Item = CacheEvent>) {
        for event in events {
            self.events.emit(&event);
        }
    }

    fn issue(&self, state: &mut CacheState, key: &QueryKey) -> FetchTicket {
        state.next_generation += 1;
        let generation = state.next_generation;
        let (sender, settled) = watch::channel(None);
        let slot = state.slots.entry(key.clone()).or_default();
        if let Some(previous) = slot.in_flight.replace(InFlight {
            generation,
            settled,
        }) {
            debug!(key = %key, superseded = previous.generation, generation, "superseding in-flight fetch");
        }
        slot.status = FetchStatus::Fetching;
        FetchTicket {
            state: Arc::clone(&self.state),
            key: key.clone(),
            generation,
            sender,
            settled: false,
        }
    }

    async fn run<F, Fut>(&self, mut ticket: FetchTicket, fetcher: F) -> Result<ListResult, QueryError>
    where
        F: FnOnce(QueryKey) -> Fut,
        Fut: Future<Output = Result<ListResult, ApiError>>,
    {
        self.events.emit(&CacheEvent::Fetching(ticket.key.clone()));
        let outcome = fetcher(ticket.key.clone()).await.map_err(QueryError::from);

        let (result, event) = {
            let mut state = self.state.lock();
            match state.slots.get_mut(&ticket.key) {
                Some(slot) if slot.in_flight_generation() == Some(ticket.generation) => {
                    slot.in_flight = None;
                    match outcome {
                        Ok(data) => {
                            slot.data = Some(data.clone());
                            slot.fetched_at = Some(Instant::now());
                            slot.status = FetchStatus::Idle;
                            slot.error = None;
                            slot.invalidated = false;
                            (Ok(data), Some(CacheEvent::Updated(ticket.key.clone())))
                        }
                        Err(err) => {
                            warn!(key = %ticket.key, error = %err, "fetch failed");
                            slot.status = FetchStatus::Error;
                            slot.error = Some(err.clone());
                            (Err(err), Some(CacheEvent::Failed(ticket.key.clone())))
                        }
                    }
                }
                _ => {
                    debug!(key = %ticket.key, generation = ticket.generation, "dropping result of irrelevant fetch");
                    (Err(QueryError::Cancelled), None)
                }
            }
        };

        ticket.settle(result.clone());
        if let Some(event) = event {
            self.events.emit(&event);
        }
        result
    }

    async fn join(mut settled: watch::Receiver<Settled>) -> Result<ListResult, QueryError> {
        let outcome = match settled.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(QueryError::Cancelled))
    }
}
