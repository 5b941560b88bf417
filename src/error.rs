//! Error types for the sync engine.

use thiserror::Error;

/// Main error type for view operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot fetch failed: {0}")]
    Fetch(String),

    #[error("Snapshot fetch timed out")]
    FetchTimeout,

    #[error("Subscription could not be established: {0}")]
    SubscribeFailed(String),

    #[error("Subscription closed by transport")]
    SubscriptionClosed,

    #[error("Row is missing a required id")]
    MissingId,

    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

impl SyncError {
    /// Whether this error came from a snapshot fetch.
    ///
    /// Fetch failures surface through the consumer-visible `error` field and
    /// are recovered by an explicit `refresh()`; they never tear down an
    /// established subscription.
    pub fn is_fetch(&self) -> bool {
        matches!(self, SyncError::Fetch(_) | SyncError::FetchTimeout)
    }

    /// Whether this error came from transforming a raw row.
    pub fn is_transform(&self) -> bool {
        matches!(self, SyncError::MissingId | SyncError::MalformedRow(_))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::MalformedRow(e.to_string())
    }
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, SyncError>;
