//! Domain Errors
//!
//! Error taxonomy for talking to the content backend. Transport failures are
//! `StoreError`; the synchronizers wrap them in a `SyncError` naming the
//! operation that failed.

use thiserror::Error;

/// Failure reported by a remote store implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        StoreError::Status {
            status: 404,
            body: format!("{} not found", what),
        }
    }
}

/// Failure turning an image reference into an upload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("data URI has no ',' separator")]
    MissingComma,
    #[error("data URI payload is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
    #[error("could not fetch image {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: StoreError,
    },
}

/// Errors surfaced to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("failed to load {content}: {source}")]
    Fetch {
        content: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to save {content} item: {source}")]
    Submit {
        content: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to delete {content} item {id}: {source}")]
    Delete {
        content: String,
        id: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to save {content} order: {source}")]
    Reorder {
        content: String,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("another change to {0} is still in flight")]
    Busy(String),
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("no item {id} in {content}")]
    UnknownItem { content: String, id: String },
    #[error("invalid form: {0}")]
    InvalidForm(String),
}

/// Common result type for synchronizer operations
pub type SyncResult<T> = Result<T, SyncError>;
