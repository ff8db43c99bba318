//! Product catalog.
//!
//! The catalog is a JSON array of [`TaskDescriptor`]s, either loaded from a
//! file or taken from the copy embedded in the crate. Loading validates that
//! names and local file names are unique and that every entry has a source
//! URL.

mod descriptor;
mod error;
mod store;

pub use descriptor::{Category, DetectionHints, TaskDescriptor, TaskKind};
pub use error::CatalogError;
pub use store::Catalog;
