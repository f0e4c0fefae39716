//! Foundation types for refl.
//!
//! refl clones, addresses, diffs, and patches instances of arbitrary
//! tree-shaped record types. This crate holds the shared vocabulary every
//! other refl crate depends on.
//!
//! # Key Types
//!
//! - [`Value`] / [`Ref`] / [`Record`] -- Dynamic value model; `Ref` gives shared objects identity
//! - [`Key`] -- Typed map key, slice index, or primary key, with its text codec
//! - [`Kind`] / [`FieldType`] -- Scalar widths and declared field shapes
//! - [`TypeDescriptor`] / [`FieldDecl`] -- Record type declarations with per-field capabilities
//! - [`Node`] -- Immutable per-type metadata tree
//! - [`Introspector`] / [`TextSerializer`] -- Contracts of the type registry and text codecs

pub mod descriptor;
pub mod error;
pub mod key;
pub mod kind;
pub mod node;
pub mod traits;
pub mod value;

pub use descriptor::{FieldDecl, TypeDescriptor};
pub use error::{TypeError, TypeResult};
pub use key::Key;
pub use kind::{FieldType, Kind};
pub use node::Node;
pub use traits::{Format, Introspector, TextSerializer};
pub use value::{Record, Ref, Value};
