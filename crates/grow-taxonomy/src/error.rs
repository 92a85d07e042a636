//! Error types for taxonomy loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a taxonomy dictionary.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Failed to read dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid dictionary TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid dictionary entry: {0}")]
    InvalidEntry(String),
}
