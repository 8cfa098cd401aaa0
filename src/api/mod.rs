//! The remote catalog collaborator.
//!
//! The sync layer never talks to a transport directly; it calls a
//! `CatalogApi`. `InMemoryCatalogApi` backs tests and local development,
//! `HttpCatalogApi` (feature `http`) talks to a REST collection.

mod error;
#[cfg(feature = "http")]
mod http;
mod in_memory;

use std::future::Future;
use std::sync::Arc;

use crate::model::{DeletedItem, Item, ItemDraft, ItemId, ItemPatch, ListResult};
use crate::query::QueryKey;

pub use error::ApiError;
#[cfg(feature = "http")]
pub use http::HttpCatalogApi;
pub use in_memory::{InMemoryCatalogApi, Operation, NEW_ITEM_RATING};

/// Remote operations on the catalog collection.
///
/// Implementations can use `async fn` for each method.
pub trait CatalogApi: Send + Sync {
    /// Fetch one page matching `key` (search, sort, limit, skip).
    fn fetch_list(&self, key: &QueryKey) -> impl Future<Output = Result<ListResult, ApiError>>;

    /// Persist a new record. The response carries the assigned id.
    fn create_item(&self, draft: &ItemDraft) -> impl Future<Output = Result<Item, ApiError>>;

    /// Apply a partial update and return the resulting record.
    fn update_item(
        &self,
        id: ItemId,
        patch: &ItemPatch,
    ) -> impl Future<Output = Result<Item, ApiError>>;

    /// Delete a record.
    fn delete_item(&self, id: ItemId) -> impl Future<Output = Result<DeletedItem, ApiError>>;
}

impl<A: CatalogApi> CatalogApi for Arc<A> {
    fn fetch_list(&self, key: &QueryKey) -> impl Future<Output = Result<ListResult, ApiError>> {
        (**self).fetch_list(key)
    }

    fn create_item(&self, draft: &ItemDraft) -> impl Future<Output = Result<Item, ApiError>> {
        (**self).create_item(draft)
    }

    fn update_item(
        &self,
        id: ItemId,
        patch: &ItemPatch,
    ) -> impl Future<Output = Result<Item, ApiError>> {
        (**self).update_item(id, patch)
    }

    fn delete_item(&self, id: ItemId) -> impl Future<Output = Result<DeletedItem, ApiError>> {
        (**self).delete_item(id)
    }
}
