//! InMemoryCatalogApi - Vec-backed catalog collection for testing and development.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{ApiError, CatalogApi};
use crate::model::{DeletedItem, Item, ItemDraft, ItemId, ItemPatch, ListResult};
use crate::query::{QueryKey, SortOrder};

/// Rating the collection gives a freshly created record.
pub const NEW_ITEM_RATING: f64 = 5.0;

/// Remote operation kinds, used to script failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchList,
    Create,
    Update,
    Delete,
}

struct Backend {
    items: Vec<Item>,
    next_id: ItemId,
    failures: HashMap<Operation, VecDeque<ApiError>>,
    calls: HashMap<Operation, usize>,
}

/// In-memory catalog collection.
///
/// Every call suspends once (or sleeps for the configured latency) before
/// answering, so callers observe a real await point. Failures can be
/// scripted per operation with `fail_next`. Clone-friendly via Arc.
#[derive(Clone)]
pub struct InMemoryCatalogApi {
    backend: Arc<Mutex<Backend>>,
    latency: Option<Duration>,
}

impl Default for InMemoryCatalogApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalogApi {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Seed the collection. New ids continue after the largest seeded id.
    pub fn with_items(items: Vec<Item>) -> Self {
        let next_id = items.iter().map(|item| item.id).max().unwrap_or(0).max(0) + 1;
        Self {
            backend: Arc::new(Mutex::new(Backend {
                items,
                next_id,
                failures: HashMap::new(),
                calls: HashMap::new(),
            })),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next call of `operation` fail with `error`. Queued failures
    /// are consumed in order.
    pub fn fail_next(&self, operation: Operation, error: ApiError) {
        self.backend
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Number of calls received for `operation`.
    pub fn calls(&self, operation: Operation) -> usize {
        self.backend
            .lock()
            .calls
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// Current server-side contents.
    pub fn items(&self) -> Vec<Item> {
        self.backend.lock().items.clone()
    }

    pub fn get(&self, id: ItemId) -> Option<Item> {
        self.backend
            .lock()
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    /// Write a record directly, as another client would.
    pub fn put(&self, item: Item) {
        let mut backend = self.backend.lock();
        backend.next_id = backend.next_id.max(item.id + 1);
        match backend.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => backend.items.push(item),
        }
    }

    fn begin(&self, operation: Operation) -> Option<ApiError> {
        let mut backend = self.backend.lock();
        *backend.calls.entry(operation).or_insert(0) += 1;
        backend
            .failures
            .get_mut(&operation)
            .and_then(|queue| queue.pop_front())
    }

    async fn round_trip(&self) {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }

    fn query(&self, key: &QueryKey) -> ListResult {
        let backend = self.backend.lock();
        let needle = key.search().map(str::to_lowercase);
        let mut matched: Vec<Item> = backend
            .items
            .iter()
            .filter(|item| match &needle {
                Some(needle) => [&item.title, &item.brand, &item.sku, &item.category]
                    .iter()
                    .any(|value| value.to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .cloned()
            .collect();

        if let Some((field, order)) = key.sort() {
            matched.sort_by(|a, b| {
                let ordering = field.compare(a, b);
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let total = matched.len() as u64;
        let skip = key.skip();
        let page: Vec<Item> = matched
            .into_iter()
            .skip(skip as usize)
            .take(key.limit().map(|l| l as usize).unwrap_or(usize::MAX))
            .collect();
        let limit = key.limit().unwrap_or(page.len() as u32);

        ListResult {
            items: page,
            total,
            skip,
            limit,
        }
    }
}

impl CatalogApi for InMemoryCatalogApi {
    async fn fetch_list(&self, key: &QueryKey) -> Result<ListResult, ApiError> {
        let failure = self.begin(Operation::FetchList);
        self.round_trip().await;
        match failure {
            Some(err) => Err(err),
            None => Ok(self.query(key)),
        }
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, ApiError> {
        let failure = self.begin(Operation::Create);
        self.round_trip().await;
        if let Some(err) = failure {
            return Err(err);
        }
        draft
            .validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        let mut backend = self.backend.lock();
        let id = backend.next_id;
        backend.next_id += 1;
        let mut item = Item::synthesize(id, draft);
        // Server-computed; a client-synthesized record always carries 0.
        item.rating = NEW_ITEM_RATING;
        backend.items.push(item.clone());
        Ok(item)
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, ApiError> {
        let failure = self.begin(Operation::Update);
        self.round_trip().await;
        if let Some(err) = failure {
            return Err(err);
        }

        let mut backend = self.backend.lock();
        let item = backend
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| ApiError::Network(format!("item {} not found", id)))?;
        patch.apply(item);
        Ok(item.clone())
    }

    async fn delete_item(&self, id: ItemId) -> Result<DeletedItem, ApiError> {
        let failure = self.begin(Operation::Delete);
        self.round_trip().await;
        if let Some(err) = failure {
            return Err(err);
        }

        let mut backend = self.backend.lock();
        let position = backend
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| ApiError::Network(format!("item {} not found", id)))?;
        let item = backend.items.remove(position);
        Ok(DeletedItem {
            item,
            is_deleted: true,
        })
    }
}
