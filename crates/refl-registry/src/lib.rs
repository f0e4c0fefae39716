//! Type registry for refl.
//!
//! Holds the record type declarations, builds and indexes their metadata
//! trees, constructs new instances, resolves enum labels, and owns the text
//! serializers. Engines only see it through [`refl_types::Introspector`].
//!
//! # Key Types
//!
//! - [`Registry`] -- Registration-then-freeze type registry
//! - [`JsonSerializer`] -- `serde_json` backed text serializer

pub mod json;
pub mod registry;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use json::JsonSerializer;
pub use registry::Registry;
