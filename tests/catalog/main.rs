//! catalog_sync integration tests.

mod cache;
mod grid;
mod interleavings;

#[cfg(feature = "http")]
mod http;
