use thiserror::Error;

use crate::kind::Kind;

/// Errors produced by type, key, and registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown type: {0}, please register it")]
    UnknownType(String),

    #[error("type {type_name} has no field {field}")]
    UnknownField { type_name: String, field: String },

    #[error("invalid key {input:?}: {reason}")]
    InvalidKey { input: String, reason: String },

    #[error("kind {0} cannot be used as a key")]
    UnsupportedKeyKind(Kind),

    #[error("shape mismatch for {target}: expected {expected}, found {found}")]
    ShapeMismatch {
        target: String,
        expected: String,
        found: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TypeError {
    pub fn invalid_key(input: impl Into<String>, reason: impl Into<String>) -> Self {
        TypeError::InvalidKey {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch(
        target: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        TypeError::ShapeMismatch {
            target: target.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Convenience alias for type-level results.
pub type TypeResult<T> = Result<T, TypeError>;
