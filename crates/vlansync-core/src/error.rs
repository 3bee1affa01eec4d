// ── Store error types ──
//
// Engine failures only. Duplicate inserts and missing rows are reported
// through the store's outcome enums, never through this type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot prepare store location {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store lock poisoned by a panicked writer")]
    Poisoned,

    #[error("Store task failed: {0}")]
    Task(String),
}
