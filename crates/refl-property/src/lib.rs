//! Property addresses for refl.
//!
//! A [`Property`] names one location inside an instance graph, such as
//! `person<{24}alice>.addresses<{24}home>.city`. Addresses parse from and
//! render to that text form, resolve against an instance, and write values
//! into it, creating intermediate structure on the way.
//!
//! # Key Types
//!
//! - [`Property`] -- Parsed address with cached canonical id
//! - [`PropertyError`] -- Parse and resolution failures

pub mod error;
mod parser;
pub mod property;

pub use error::{PropertyError, PropertyResult};
pub use property::Property;
