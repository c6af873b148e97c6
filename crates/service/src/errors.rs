use std::time::Duration;

use thiserror::Error;

use crate::storage::collection::CollectionError;

/// Coarse classification the HTTP layer maps to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Storage,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("person not found")]
    NotFound(i64),
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("identifier {0} is already taken")]
    DuplicateId(i64),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("database error: {0}")]
    Db(String),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Storage,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Short label used for metrics and structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "not_found",
            StorageError::Timeout(_) => "timeout",
            StorageError::DuplicateId(_) => "duplicate_id",
            StorageError::Decode(_) => "decode",
            StorageError::Db(_) => "db",
        }
    }
}

impl From<CollectionError> for StorageError {
    fn from(e: CollectionError) -> Self {
        match e {
            CollectionError::DuplicateKey(id) => StorageError::DuplicateId(id),
            CollectionError::Decode(msg) => StorageError::Decode(msg),
            CollectionError::Backend(msg) => StorageError::Db(msg),
        }
    }
}
