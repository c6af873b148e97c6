use async_trait::async_trait;
use thiserror::Error;

use models::Person;

/// Driver-level failures reported by a backing collection.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CollectionError {
    #[error("duplicate key: {0}")]
    DuplicateKey(i64),
    #[error("cannot decode document: {0}")]
    Decode(String),
    #[error("{0}")]
    Backend(String),
}

/// One collection of person documents keyed by integer id.
///
/// Implementations only translate calls into store queries. They do not lock,
/// assign ids or apply deadlines; the engine owns those concerns.
#[async_trait]
pub trait PersonCollection: Send + Sync {
    /// Number of documents currently stored.
    async fn count(&self) -> Result<u64, CollectionError>;
    /// Highest stored id, `None` for an empty collection.
    async fn max_id(&self) -> Result<Option<i64>, CollectionError>;
    async fn find_one(&self, id: i64) -> Result<Option<Person>, CollectionError>;
    /// Full scan ordered by id. The outer error means the scan could not run at
    /// all; inner errors are documents that could not be decoded.
    async fn find_all(&self) -> Result<Vec<Result<Person, CollectionError>>, CollectionError>;
    /// Store a new document. An existing document with the same id is an error.
    async fn insert_one(&self, person: &Person) -> Result<(), CollectionError>;
    /// Replace the document with `person.id`; returns the matched count (0 or 1).
    async fn replace_one(&self, person: &Person) -> Result<u64, CollectionError>;
    /// Returns the deleted count (0 or 1).
    async fn delete_one(&self, id: i64) -> Result<u64, CollectionError>;
}
