//! Error types for justvibe

use thiserror::Error;

/// Failure to load the album catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level failure (connection refused, timeout, ...)
    #[error("failed to reach catalog: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Failed to load albums: {0}")]
    Status(u16),

    /// Payload was not a sequence of albums
    #[error("invalid catalog payload: {0}")]
    InvalidPayload(String),
}

/// Failure while fetching or bundling audio
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Primary fetch returned a non-success HTTP status
    #[error("network response was not ok: {status}")]
    NetworkFailure { status: u16 },

    /// Request could not be sent or the body could not be read
    #[error("request failed: {0}")]
    Request(String),

    /// Archive build or save failed
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// Writing the artifact failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if !status.is_success() => DownloadError::NetworkFailure {
                status: status.as_u16(),
            },
            _ => DownloadError::Request(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for DownloadError {
    fn from(err: zip::result::ZipError) -> Self {
        DownloadError::DownloadFailed(format!("archive build failed: {err}"))
    }
}

/// Failure reading or writing persisted user state
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored value exists but is not valid for its key; it is left untouched
    #[error("stored {key} is unreadable: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Failure changing playback state
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Starting a new track requires a logged-in user
    #[error("log in to play music")]
    LoginRequired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure driving the quality selection dialog
#[derive(Debug, Error)]
pub enum DialogError {
    /// Operation is not valid in the dialog's current state
    #[error("dialog is {0}, expected {1}")]
    InvalidState(&'static str, &'static str),

    #[error(transparent)]
    Download(#[from] DownloadError),
}
