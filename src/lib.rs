//! catalog_sync - client-side sync layer for an editable product catalog.
//!
//! - `query`: list results cached by normalized query key, with request
//!   de-duplication and last-issued-wins commits
//! - `mutation`: optimistic create/update/delete with exact rollback
//! - `grid`: per-row edit modes and the singleton new row
//! - `catalog`: the facade a catalog screen drives
//!
//! The remote collection is reached through the `CatalogApi` trait;
//! `InMemoryCatalogApi` backs tests and `HttpCatalogApi` (feature `http`)
//! talks to a REST service.

pub mod api;
pub mod catalog;
pub mod config;
pub mod debounce;
mod emitter;
pub mod grid;
pub mod model;
pub mod mutation;
pub mod query;
pub mod session;

#[cfg(feature = "http")]
pub use api::HttpCatalogApi;
pub use api::{ApiError, CatalogApi, InMemoryCatalogApi, Operation, NEW_ITEM_RATING};
pub use catalog::{Catalog, CatalogState, Notice, NoticeLevel};
pub use config::{CatalogConfig, ConfigError};
pub use debounce::{debounce, Debounced, Debouncer};
pub use emitter::SubscriptionId;
pub use grid::{CommitOutcome, EditableGridController, GridError, GridRow, NewRow, RowEdit, RowMode};
pub use model::{
    is_unpersisted, AvailabilityStatus, DeletedItem, Field, FieldValue, Item, ItemDraft, ItemId,
    ItemPatch, ListResult, ValidationError, NEW_ROW_ID,
};
pub use mutation::{
    CreateReconcile, MutationCoordinator, MutationError, MutationKind, OptimisticOp,
    PendingMutation,
};
pub use query::{
    all_lists, CacheEntry, CacheEvent, CacheSnapshot, FetchStatus, QueryCache, QueryError,
    QueryKey, SortField, SortOrder,
};
pub use session::AuthGate;
