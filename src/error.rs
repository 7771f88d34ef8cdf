//! Error types for the ledger, grouped by the layer that raises them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or decoding model values.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("monthly due day must be between 1 and 28, got {0}")]
    DueDayOutOfRange(i64),

    #[error("invalid date '{0}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS")]
    InvalidDate(String),
}

/// Errors raised by the persistence store.
///
/// Single-record reads that find nothing return `Ok(None)`; absence is
/// never an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} has not been saved yet")]
    InvalidId { entity: &'static str },

    #[error("failed to save {entity}: {source}")]
    SaveFailed {
        entity: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to update {entity} {id}: {source}")]
    UpdateFailed {
        entity: &'static str,
        id: i64,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to delete {entity} {id}: {source}")]
    DeleteFailed {
        entity: &'static str,
        id: i64,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to fetch {entity}: {source}")]
    FetchFailed {
        entity: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a notification center.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification rejected: {0}")]
    Rejected(String),

    #[error("reminder journal error: {0}")]
    Journal(#[from] rusqlite::Error),

    #[error("notification task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("reminder journal lock poisoned")]
    Poisoned,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to get user directories")]
    NoHomeDirectory,

    #[error("directory is not writable: {0}")]
    NotWritable(PathBuf),

    #[error("{field} must be between 0 and 365 days, got {days}")]
    LeadOutOfRange { field: &'static str, days: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;
