//! Grid layer - edit-mode state machine for the catalog table.

mod controller;
mod error;
mod row;

pub use controller::EditableGridController;
pub use error::GridError;
pub use row::{CommitOutcome, GridRow, NewRow, RowEdit, RowMode};
