//! Catalog errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or querying a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate product name '{0}'")]
    DuplicateName(String),

    #[error("products '{first}' and '{second}' share the local file name '{file_name}'")]
    DuplicateFileName {
        file_name: String,
        first: String,
        second: String,
    },

    #[error("product '{name}' has an empty {field}")]
    MissingField { name: String, field: &'static str },

    #[error("unknown product '{0}'")]
    UnknownProduct(String),
}
