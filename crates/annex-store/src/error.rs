//! Error types for the bucket store and the attachments built on it.

use annex_common::CommentId;
use thiserror::Error;

/// Error type for bucket store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket name required")]
    InvalidName,
    #[error("key required")]
    KeyRequired,
    #[error("incompatible value at {0}: a key and a bucket cannot share a name")]
    IncompatibleValue(String),
    #[error("store is closed")]
    Closed,
    #[error("redb error: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

impl StoreError {
    /// True if the storage engine itself failed, as opposed to the caller
    /// addressing buckets or keys incorrectly.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Closed
                | Self::Database(_)
                | Self::Storage(_)
                | Self::Table(_)
                | Self::Transaction(_)
                | Self::Commit(_)
                | Self::Codec(_)
                | Self::Io(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for rating and comment attachments
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("resource type, {kind}, not found")]
    ResourceTypeNotFound { kind: String },

    #[error("{kind} not found with key {key}")]
    ResourceInstanceNotFound { kind: String, key: String },

    #[error("comment with key {id} not found for {kind} with id {key}")]
    CommentNotFound {
        kind: String,
        key: String,
        id: CommentId,
    },

    #[error("comment should not be empty")]
    EmptyComment,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for AttachError {
    fn from(e: serde_json::Error) -> Self {
        Self::Store(StoreError::Codec(e))
    }
}

impl AttachError {
    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ResourceTypeNotFound { .. }
                | Self::ResourceInstanceNotFound { .. }
                | Self::CommentNotFound { .. }
        )
    }
}

pub type AttachResult<T> = Result<T, AttachError>;
