use crate::model::{Item, ItemDraft};

use super::error::GridError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowMode {
    #[default]
    View,
    Editing,
}

/// Edit state of an existing row. Rows in view mode have none.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEdit {
    /// Last confirmed values, shown again on cancel.
    pub baseline: ItemDraft,
    /// Values entered so far.
    pub buffer: ItemDraft,
    pub saving: bool,
    pub error: Option<GridError>,
}

impl RowEdit {
    pub(crate) fn new(item: &Item) -> Self {
        let baseline = item.draft();
        RowEdit {
            buffer: baseline.clone(),
            baseline,
            saving: false,
            error: None,
        }
    }
}

/// The unsaved row shown on top of the grid while adding a record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRow {
    pub values: ItemDraft,
    pub saving: bool,
    pub error: Option<GridError>,
    /// Distinguishes this slot from one opened after it was cancelled.
    pub(crate) token: u64,
}

/// A row as the grid displays it.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub item: Item,
    pub mode: RowMode,
    /// The new-row slot, keyed by the sentinel id.
    pub is_new: bool,
    pub saving: bool,
    pub error: Option<GridError>,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Created(Item),
    Updated(Item),
    /// No field changed; nothing was sent.
    Unchanged,
}
