//! Catalog records and the value types the sync layer moves around.
//!
//! `Item` is a fixed schema: editable columns plus server-owned ones.
//! Edits travel as `ItemDraft` (whole editable row) or `ItemPatch`
//! (changed fields only, built with `ItemPatch::diff`).

mod draft;
mod error;
mod item;
mod list;
mod patch;

pub use draft::{Field, FieldValue, ItemDraft};
pub use error::ValidationError;
pub use item::{is_unpersisted, AvailabilityStatus, DeletedItem, Item, ItemId, NEW_ROW_ID};
pub use list::ListResult;
pub use patch::ItemPatch;
