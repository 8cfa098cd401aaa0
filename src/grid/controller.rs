//! EditableGridController - per-row edit modes and the new-row slot.
//!
//! Rows are in view mode unless they have an edit entry. The controller only
//! keeps edit metadata and buffered values keyed by id; the records
//! themselves stay in the query cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::error::GridError;
use super::row::{CommitOutcome, GridRow, NewRow, RowEdit, RowMode};
use crate::api::CatalogApi;
use crate::model::{
    is_unpersisted, FieldValue, Item, ItemDraft, ItemId, ItemPatch, ValidationError, NEW_ROW_ID,
};
use crate::mutation::MutationCoordinator;

#[derive(Default)]
struct GridState {
    rows: HashMap<ItemId, RowEdit>,
    new_row: Option<NewRow>,
    next_token: u64,
}

pub struct EditableGridController<A> {
    coordinator: MutationCoordinator<A>,
    state: Arc<Mutex<GridState>>,
}

impl<A> Clone for EditableGridController<A> {
    fn clone(&self) -> Self {
        EditableGridController {
            coordinator: self.coordinator.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: CatalogApi> EditableGridController<A> {
    pub fn new(coordinator: MutationCoordinator<A>) -> Self {
        EditableGridController {
            coordinator,
            state: Arc::new(Mutex::new(GridState::default())),
        }
    }

    pub fn coordinator(&self) -> &MutationCoordinator<A> {
        &self.coordinator
    }

    /// Open the new-row slot. Fails while one is already open.
    pub fn begin_add(&self) -> Result<(), GridError> {
        let mut state = self.state.lock();
        if state.new_row.is_some() {
            return Err(GridError::NewRowPending);
        }
        state.next_token += 1;
        state.new_row = Some(NewRow {
            values: ItemDraft::default(),
            saving: false,
            error: None,
            token: state.next_token,
        });
        debug!("new row opened");
        Ok(())
    }

    /// Put an existing row in edit mode. A row already being edited keeps
    /// its buffered values. Rows that are not persisted yet cannot be
    /// edited.
    pub fn begin_edit(&self, item: &Item) -> Result<(), GridError> {
        if is_unpersisted(item.id) {
            return Err(ValidationError::UnpersistedId(item.id).into());
        }
        self.state
            .lock()
            .rows
            .entry(item.id)
            .or_insert_with(|| RowEdit::new(item));
        Ok(())
    }

    /// Buffer a single cell edit. Nothing is sent.
    pub fn set_cell(&self, id: ItemId, value: FieldValue) -> Result<(), GridError> {
        let mut state = self.state.lock();
        let buffer = if id == NEW_ROW_ID {
            state.new_row.as_mut().map(|row| &mut row.values)
        } else {
            state.rows.get_mut(&id).map(|row| &mut row.buffer)
        };
        match buffer {
            Some(buffer) => {
                buffer.set(value);
                Ok(())
            }
            None => Err(GridError::NotEditing(id)),
        }
    }

    pub fn mode(&self, id: ItemId) -> RowMode {
        let state = self.state.lock();
        let editing = if id == NEW_ROW_ID {
            state.new_row.is_some()
        } else {
            state.rows.contains_key(&id)
        };
        if editing {
            RowMode::Editing
        } else {
            RowMode::View
        }
    }

    pub fn new_row(&self) -> Option<NewRow> {
        self.state.lock().new_row.clone()
    }

    pub fn edit(&self, id: ItemId) -> Option<RowEdit> {
        self.state.lock().rows.get(&id).cloned()
    }

    /// Buffered values and last confirmed values of a row in edit mode.
    pub fn buffered(&self, id: ItemId) -> Option<(ItemDraft, ItemDraft)> {
        let state = self.state.lock();
        if id == NEW_ROW_ID {
            state
                .new_row
                .as_ref()
                .map(|row| (row.values.clone(), ItemDraft::default()))
        } else {
            state
                .rows
                .get(&id)
                .map(|row| (row.buffer.clone(), row.baseline.clone()))
        }
    }

    /// Save a row.
    ///
    /// For the new row, `new` is validated and created; the slot closes on
    /// success and keeps the entered values plus the error on failure. For
    /// an existing row only the fields that differ from `old` are sent; the
    /// row returns to view mode on success, and on failure stays in edit
    /// mode showing `old` with the error attached.
    pub async fn commit(
        &self,
        id: ItemId,
        new: &ItemDraft,
        old: &ItemDraft,
    ) -> Result<CommitOutcome, GridError> {
        if id == NEW_ROW_ID {
            self.commit_new(new).await
        } else {
            self.commit_existing(id, new, old).await
        }
    }

    /// Leave edit mode without sending anything. For the new row the slot
    /// is discarded. Returns false if the row was not being edited.
    pub fn cancel(&self, id: ItemId) -> bool {
        let mut state = self.state.lock();
        if id == NEW_ROW_ID {
            state.new_row.take().is_some()
        } else {
            state.rows.remove(&id).is_some()
        }
    }

    /// Decorate a list for display: the new row on top, rows in edit mode
    /// showing their buffered values.
    pub fn rows(&self, items: &[Item]) -> Vec<GridRow> {
        let state = self.state.lock();
        let mut rows = Vec::with_capacity(items.len() + 1);
        if let Some(new_row) = &state.new_row {
            let mut item = Item::blank(NEW_ROW_ID);
            item.apply_draft(&new_row.values);
            rows.push(GridRow {
                item,
                mode: RowMode::Editing,
                is_new: true,
                saving: new_row.saving,
                error: new_row.error.clone(),
            });
        }
        for item in items {
            let row = match state.rows.get(&item.id) {
                Some(edit) => {
                    let mut shown = item.clone();
                    shown.apply_draft(&edit.buffer);
                    GridRow {
                        item: shown,
                        mode: RowMode::Editing,
                        is_new: false,
                        saving: edit.saving,
                        error: edit.error.clone(),
                    }
                }
                None => GridRow {
                    item: item.clone(),
                    mode: RowMode::View,
                    is_new: false,
                    saving: false,
                    error: None,
                },
            };
            rows.push(row);
        }
        rows
    }

    async fn commit_new(&self, values: &ItemDraft) -> Result<CommitOutcome, GridError> {
        let token = {
            let mut state = self.state.lock();
            let slot = state
                .new_row
                .as_mut()
                .ok_or(GridError::NotEditing(NEW_ROW_ID))?;
            if slot.saving {
                return Err(GridError::NewRowSaving);
            }
            slot.values = values.clone();
            if let Err(err) = values.validate() {
                slot.error = Some(err.clone().into());
                return Err(err.into());
            }
            slot.saving = true;
            slot.error = None;
            slot.token
        };

        let result = self.coordinator.create(values.clone()).await;

        let mut state = self.state.lock();
        let slot = state.new_row.as_mut().filter(|slot| slot.token == token);
        match result {
            Ok(item) => {
                if slot.is_some() {
                    state.new_row = None;
                }
                debug!(id = item.id, "new row saved");
                Ok(CommitOutcome::Created(item))
            }
            Err(err) => {
                let err = GridError::from(err);
                if let Some(slot) = slot {
                    slot.saving = false;
                    slot.error = Some(err.clone());
                }
                Err(err)
            }
        }
    }

    async fn commit_existing(
        &self,
        id: ItemId,
        new: &ItemDraft,
        old: &ItemDraft,
    ) -> Result<CommitOutcome, GridError> {
        let patch = ItemPatch::diff(new, old);
        {
            let mut state = self.state.lock();
            let row = state.rows.get_mut(&id).ok_or(GridError::NotEditing(id))?;
            if row.saving {
                return Err(GridError::RowSaving(id));
            }
            row.buffer = new.clone();
            if patch.is_empty() {
                state.rows.remove(&id);
                return Ok(CommitOutcome::Unchanged);
            }
            if let Err(err) = patch.validate() {
                row.error = Some(err.clone().into());
                return Err(err.into());
            }
            row.saving = true;
            row.error = None;
        }

        let result = self.coordinator.update(id, patch).await;

        let mut state = self.state.lock();
        match result {
            Ok(item) => {
                state.rows.remove(&id);
                Ok(CommitOutcome::Updated(item))
            }
            Err(err) => {
                let err = GridError::from(err);
                if let Some(row) = state.rows.get_mut(&id) {
                    row.saving = false;
                    row.baseline = old.clone();
                    row.buffer = old.clone();
                    row.error = Some(err.clone());
                }
                Err(err)
            }
        }
    }
}
