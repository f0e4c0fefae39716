//! Diff and patch engine for refl.
//!
//! An [`Updater`] compares two instances of the same registered record type
//! and produces an ordered list of [`Change`]s, each addressed by a
//! [`refl_property::Property`]. A change applies to any other instance of the
//! type, or builds a new one from its address alone.
//!
//! # Key Types
//!
//! - [`Updater`] -- Diff engine; brings the old instance up to date
//! - [`Change`] / [`ChangeRecord`] -- One difference and its serializable form
//! - [`UpdaterConfig`] -- Zero-value and deletion semantics

mod compare;

pub mod change;
pub mod config;
pub mod error;
pub mod updater;

pub use change::{Change, ChangeRecord};
pub use config::UpdaterConfig;
pub use error::{DiffError, DiffResult};
pub use updater::Updater;
