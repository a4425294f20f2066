//! Errors from record store operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::corruption::CorruptionKind;

#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error reading/writing a record.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error while writing.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document failed the structural integrity check; route to repair
    /// before attempting anything else with it.
    #[error("corrupt record {path}: {kind}")]
    Corrupt { path: PathBuf, kind: CorruptionKind },

    /// No record with that name in the given folder.
    #[error("play not found: {0}")]
    NotFound(String),
}
