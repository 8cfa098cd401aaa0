use std::fmt;

use super::draft::Field;
use super::item::ItemId;

/// A local input check failed. Raised before any network call and before
/// the cache is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required fields are blank or zero.
    MissingRequired(Vec<Field>),
    /// A numeric field is outside its accepted range.
    OutOfRange { field: Field, value: String },
    /// An update carried no changed field.
    NothingToUpdate(ItemId),
    /// The id names a row that was never persisted.
    UnpersistedId(ItemId),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingRequired(fields) => {
                write!(f, "required fields missing: ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                Ok(())
            }
            ValidationError::OutOfRange { field, value } => {
                write!(f, "{} out of range: {}", field, value)
            }
            ValidationError::NothingToUpdate(id) => {
                write!(f, "no changed fields to submit for item {}", id)
            }
            ValidationError::UnpersistedId(id) => {
                write!(f, "item {} has not been persisted", id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
