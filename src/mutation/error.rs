use std::fmt;

use crate::api::ApiError;
use crate::model::{ItemId, ValidationError};

/// Error type for create/update/delete.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationError {
    /// Rejected locally; nothing was sent and the cache is untouched.
    Validation(ValidationError),
    /// Another mutation for this id is still outstanding.
    Busy(ItemId),
    /// The remote call failed; the optimistic change was rolled back.
    Api(ApiError),
    /// The mutation was rolled back because the session was rejected while
    /// it was outstanding. Its remote result, if any, was dropped.
    Aborted,
    /// Mutations are stopped until the session is re-authenticated.
    Suspended,
}

impl MutationError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, MutationError::Api(err) if err.is_unauthorized())
    }
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationError::Validation(err) => write!(f, "{}", err),
            MutationError::Busy(id) => write!(f, "item {} has a change in progress", id),
            MutationError::Api(err) => write!(f, "{}", err),
            MutationError::Aborted => write!(f, "change aborted: session expired"),
            MutationError::Suspended => write!(f, "changes are paused until you sign in again"),
        }
    }
}

impl std::error::Error for MutationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MutationError::Validation(err) => Some(err),
            MutationError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for MutationError {
    fn from(err: ValidationError) -> Self {
        MutationError::Validation(err)
    }
}

impl From<ApiError> for MutationError {
    fn from(err: ApiError) -> Self {
        MutationError::Api(err)
    }
}
