//! Catalog - the interface the catalog screen talks to.
//!
//! Wires the query cache, mutation coordinator, grid controller and auth
//! gate together around a current list query, and publishes a
//! `CatalogState` to subscribers after every visible change.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::api::CatalogApi;
use crate::config::CatalogConfig;
use crate::debounce::{debounce, Debounced, Debouncer};
use crate::emitter::{Emitter, SubscriptionId};
use crate::grid::{CommitOutcome, EditableGridController, GridError, GridRow};
use crate::model::{DeletedItem, FieldValue, ItemDraft, ItemId, ListResult, NEW_ROW_ID};
use crate::mutation::{MutationCoordinator, MutationError};
use crate::query::{FetchStatus, QueryCache, QueryError, QueryKey, SortField, SortOrder};
use crate::session::AuthGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient message shown after a save or delete settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything the catalog screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogState {
    pub query: QueryKey,
    pub rows: Vec<GridRow>,
    pub total: u64,
    pub loading: bool,
    /// Failure of the latest fetch. Rows from the previous successful fetch
    /// stay in `rows`.
    pub error: Option<QueryError>,
    pub notice: Option<Notice>,
    pub suspended: bool,
}

struct View {
    query: QueryKey,
    notice: Option<Notice>,
}

struct Inner<A> {
    api: Arc<A>,
    cache: QueryCache,
    coordinator: MutationCoordinator<A>,
    grid: EditableGridController<A>,
    gate: AuthGate,
    config: CatalogConfig,
    view: Mutex<View>,
    changes: Emitter<CatalogState>,
}

/// Clone-friendly handle; clones share all state.
pub struct Catalog<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for Catalog<A> {
    fn clone(&self) -> Self {
        Catalog {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: CatalogApi + 'static> Catalog<A> {
    pub fn new(api: A) -> Self {
        Self::with_config(Arc::new(api), CatalogConfig::default())
    }

    pub fn with_config(api: Arc<A>, config: CatalogConfig) -> Self {
        let mut cache = QueryCache::new();
        if let Some(stale_time) = config.stale_time() {
            cache = cache.with_stale_time(stale_time);
        }
        let gate = AuthGate::new();
        let coordinator = MutationCoordinator::new(Arc::clone(&api), cache.clone())
            .with_gate(gate.clone())
            .with_reconcile(config.create_reconcile);
        let grid = EditableGridController::new(coordinator.clone());
        let query = QueryKey::new().with_limit(config.page_limit);

        let inner = Arc::new(Inner {
            api,
            cache,
            coordinator,
            grid,
            gate,
            config,
            view: Mutex::new(View {
                query,
                notice: None,
            }),
            changes: Emitter::new(),
        });

        let weak: Weak<Inner<A>> = Arc::downgrade(&inner);
        inner.cache.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                Catalog { inner }.publish();
            }
        });

        Catalog { inner }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.inner.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    pub fn coordinator(&self) -> &MutationCoordinator<A> {
        &self.inner.coordinator
    }

    pub fn grid(&self) -> &EditableGridController<A> {
        &self.inner.grid
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    pub fn query(&self) -> QueryKey {
        self.inner.view.lock().query.clone()
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Read the current query through the cache.
    pub async fn load(&self) -> Result<ListResult, QueryError> {
        let query = self.query();
        let api = Arc::clone(&self.inner.api);
        let result = self
            .inner
            .cache
            .request(&query, |key| async move { api.fetch_list(&key).await })
            .await;
        self.settle_read(result)
    }

    /// Invalidate the current query and fetch it again.
    pub async fn refresh(&self) -> Result<ListResult, QueryError> {
        let query = self.query();
        self.inner.cache.invalidate(&|key: &QueryKey| key == &query);
        let api = Arc::clone(&self.inner.api);
        let result = self
            .inner
            .cache
            .refetch(&query, |key| async move { api.fetch_list(&key).await })
            .await;
        self.settle_read(result)
    }

    /// Apply a search term and load the matching list.
    pub async fn search(&self, term: &str) -> Result<ListResult, QueryError> {
        self.set_query(|query| query.with_search(term));
        self.load().await
    }

    pub async fn sort(&self, field: SortField, order: SortOrder) -> Result<ListResult, QueryError> {
        self.set_query(|query| query.with_sort(field, order));
        self.load().await
    }

    pub async fn unsort(&self) -> Result<ListResult, QueryError> {
        self.set_query(QueryKey::without_sort);
        self.load().await
    }

    /// Input handle and settled-term stream for the search box, using the
    /// configured quiet period.
    pub fn search_input(&self) -> (Debouncer<String>, Debounced<String>) {
        debounce(self.inner.config.search_debounce())
    }

    /// Apply settled search terms until the input side is dropped.
    pub async fn drive_search(&self, mut terms: Debounced<String>) {
        while let Some(term) = terms.next().await {
            debug!(term = %term, "search term settled");
            if let Err(err) = self.search(&term).await {
                debug!(error = %err, "search load failed");
            }
        }
    }

    // ========================================================================
    // Editing
    // ========================================================================

    pub fn begin_add(&self) -> Result<(), GridError> {
        let result = self.inner.grid.begin_add();
        self.publish();
        result
    }

    /// Put a row of the current list in edit mode.
    pub fn begin_edit(&self, id: ItemId) -> Result<(), GridError> {
        let item = self
            .current_list()
            .and_then(|list| list.get(id).cloned())
            .ok_or(GridError::UnknownRow(id))?;
        let result = self.inner.grid.begin_edit(&item);
        self.publish();
        result
    }

    pub fn set_cell(&self, id: ItemId, value: FieldValue) -> Result<(), GridError> {
        let result = self.inner.grid.set_cell(id, value);
        self.publish();
        result
    }

    /// Save a row with `values`. Existing rows are diffed against their
    /// last confirmed values.
    pub async fn commit(&self, id: ItemId, values: ItemDraft) -> Result<CommitOutcome, GridError> {
        let old = if id == NEW_ROW_ID {
            ItemDraft::default()
        } else {
            match self.inner.grid.edit(id) {
                Some(edit) => edit.baseline,
                None => {
                    self.begin_edit(id)?;
                    self.inner
                        .grid
                        .edit(id)
                        .map(|edit| edit.baseline)
                        .ok_or(GridError::NotEditing(id))?
                }
            }
        };

        let result = self.inner.grid.commit(id, &values, &old).await;

        let notice = match &result {
            Ok(CommitOutcome::Created(item)) => Some(Notice::success(format!("Created {}", item.title))),
            Ok(CommitOutcome::Updated(item)) => Some(Notice::success(format!("Updated {}", item.title))),
            Ok(CommitOutcome::Unchanged) => None,
            Err(GridError::Mutation(err)) => Some(Notice::error(err.to_string())),
            Err(_) => None,
        };
        self.settle_write(notice).await;
        result
    }

    /// Leave edit mode without saving.
    pub fn cancel(&self, id: ItemId) -> bool {
        let cancelled = self.inner.grid.cancel(id);
        self.publish();
        cancelled
    }

    pub async fn delete(&self, id: ItemId) -> Result<DeletedItem, MutationError> {
        let result = self.inner.coordinator.delete(id).await;
        let notice = match &result {
            Ok(deleted) => Some(Notice::success(format!("Deleted {}", deleted.item.title))),
            Err(err) => Some(Notice::error(err.to_string())),
        };
        self.settle_write(notice).await;
        result
    }

    pub fn dismiss_notice(&self) {
        self.inner.view.lock().notice = None;
        self.publish();
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Register a handler run once when the session is rejected.
    pub fn on_unauthorized<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.gate.on_unauthorized(handler)
    }

    /// Entry point for a transport that saw a rejected credential.
    pub fn handle_unauthorized(&self) {
        self.inner.coordinator.handle_unauthorized();
        self.publish();
    }

    /// Lift the suspension after the user signed in again.
    pub fn reauthenticated(&self) {
        info!("session re-authenticated");
        self.inner.coordinator.resume();
        self.publish();
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn state(&self) -> CatalogState {
        let (query, notice) = {
            let view = self.inner.view.lock();
            (view.query.clone(), view.notice.clone())
        };
        let entry = self.inner.cache.get(&query);
        let (items, total) = entry
            .as_ref()
            .and_then(|entry| entry.data.as_ref())
            .map(|list| (list.items.clone(), list.total))
            .unwrap_or_default();
        let loading = entry
            .as_ref()
            .is_some_and(|entry| entry.status == FetchStatus::Fetching);
        let error = entry.and_then(|entry| entry.error);

        CatalogState {
            rows: self.inner.grid.rows(&items),
            query,
            total,
            loading,
            error,
            notice,
            suspended: self.inner.cache.is_suspended(),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&CatalogState) + Send + Sync + 'static,
    {
        self.inner.changes.on(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.changes.off(id)
    }

    fn publish(&self) {
        if self.inner.changes.is_empty() {
            return;
        }
        self.inner.changes.emit(&self.state());
    }

    fn set_query<F>(&self, change: F)
    where
        F: FnOnce(QueryKey) -> QueryKey,
    {
        {
            let mut view = self.inner.view.lock();
            let query = std::mem::take(&mut view.query);
            view.query = change(query);
        }
        self.publish();
    }

    fn current_list(&self) -> Option<ListResult> {
        self.inner.cache.data(&self.query())
    }

    fn settle_read(&self, result: Result<ListResult, QueryError>) -> Result<ListResult, QueryError> {
        if let Err(err) = &result {
            if err.is_unauthorized() {
                self.handle_unauthorized();
            }
        }
        result
    }

    /// Post the notice, then reload the current query if the write left it
    /// stale.
    async fn settle_write(&self, notice: Option<Notice>) {
        if notice.is_some() {
            self.inner.view.lock().notice = notice;
        }
        self.publish();

        let query = self.query();
        let stale = self
            .inner
            .cache
            .get(&query)
            .is_some_and(|entry| entry.invalidated);
        if stale && !self.inner.cache.is_suspended() {
            if let Err(err) = self.load().await {
                debug!(error = %err, "reload after write failed");
            }
        }
    }
}
