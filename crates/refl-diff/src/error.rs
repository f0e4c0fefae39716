//! Error types for the diff crate.

use refl_property::PropertyError;
use refl_types::TypeError;

/// Errors that can occur while diffing or replaying changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// An input is nil, not a record, or holds a value no instance can hold.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The root type of the inputs is not registered.
    #[error("unregistered type: {0}")]
    UnregisteredType(String),

    /// Old and new values differ in type or kind at an address.
    #[error("type mismatch at {property_id}: old is {old}, new is {new}")]
    Mismatch {
        property_id: String,
        old: String,
        new: String,
    },

    /// Invalid updater configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Address parse or write failure.
    #[error("property error: {0}")]
    Property(#[from] PropertyError),

    /// Registry or text codec failure.
    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
