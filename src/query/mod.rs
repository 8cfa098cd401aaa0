//! Query layer - normalized list keys and the result cache.

mod cache;
mod entry;
mod error;
mod key;

pub use cache::{all_lists, QueryCache};
pub use entry::{CacheEntry, CacheEvent, CacheSnapshot, FetchStatus};
pub use error::QueryError;
pub use key::{QueryKey, SortField, SortOrder};
