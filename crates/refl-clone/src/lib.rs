//! Deep cloning for refl.
//!
//! [`Cloner`] copies any [`refl_types::Value`] graph, preserving cycles and
//! shared references, and honoring the per-field `copy` capability declared
//! in the registry.

pub mod cloner;

pub use cloner::Cloner;
