use std::fmt;

use crate::model::{ItemId, ValidationError};
use crate::mutation::MutationError;

#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// An unsaved new row already exists.
    NewRowPending,
    /// The new row's create is still in flight.
    NewRowSaving,
    /// No row with this id is displayed.
    UnknownRow(ItemId),
    /// The row is not in edit mode.
    NotEditing(ItemId),
    /// The row's update is still in flight.
    RowSaving(ItemId),
    /// The entered values failed local checks; nothing was sent.
    Validation(ValidationError),
    /// The save was sent and failed.
    Mutation(MutationError),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::NewRowPending => write!(f, "finish or cancel the new row first"),
            GridError::NewRowSaving => write!(f, "the new row is being saved"),
            GridError::UnknownRow(id) => write!(f, "no row {} in the current list", id),
            GridError::NotEditing(id) => write!(f, "row {} is not being edited", id),
            GridError::RowSaving(id) => write!(f, "row {} is being saved", id),
            GridError::Validation(err) => write!(f, "{}", err),
            GridError::Mutation(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GridError::Validation(err) => Some(err),
            GridError::Mutation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for GridError {
    fn from(err: ValidationError) -> Self {
        GridError::Validation(err)
    }
}

impl From<MutationError> for GridError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::Validation(err) => GridError::Validation(err),
            other => GridError::Mutation(other),
        }
    }
}
