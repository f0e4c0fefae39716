//! Error types for property addresses.

use refl_types::TypeError;

/// Errors that can occur while parsing or resolving a property address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// No metadata node is registered under the address's node key.
    #[error("unknown attribute {0}")]
    UnknownAttribute(String),

    /// The address text does not follow the grammar.
    #[error("malformed property id {input:?}: {reason}")]
    Malformed { input: String, reason: String },

    /// An intermediate value is nil, a map entry is absent, or a slice index
    /// is out of range.
    #[error("{property_id}: not found")]
    NotFound { property_id: String },

    /// A value does not have the shape the address declares.
    #[error("{property_id}: expected {expected}, found {found}")]
    TypeMismatch {
        property_id: String,
        expected: String,
        found: String,
    },

    /// Registry or key codec failure.
    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

impl PropertyError {
    pub fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        PropertyError::Malformed {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(property_id: impl Into<String>) -> Self {
        PropertyError::NotFound {
            property_id: property_id.into(),
        }
    }

    pub fn type_mismatch(
        property_id: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        PropertyError::TypeMismatch {
            property_id: property_id.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Convenience alias for property results.
pub type PropertyResult<T> = Result<T, PropertyError>;
