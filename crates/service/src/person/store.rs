use async_trait::async_trait;

use models::Person;

use crate::errors::StorageError;

/// Outcome of a full scan.
///
/// `persons` holds every record that could be read; `error` holds the first
/// failure seen during the scan, if any. A scan that could not start at all
/// has no persons and an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub persons: Vec<Person>,
    pub error: Option<StorageError>,
}

impl ScanResult {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Strict view: any scan failure turns the whole result into an error.
    pub fn into_result(self) -> Result<Vec<Person>, StorageError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.persons),
        }
    }
}

/// The storage contract the HTTP layer consumes.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Assign an identifier, store the person and write the id back into `person`.
    async fn insert(&self, person: &mut Person) -> Result<i64, StorageError>;
    async fn get(&self, id: i64) -> Result<Person, StorageError>;
    async fn get_all(&self) -> ScanResult;
    /// Replace every field of the stored record with `person.id`.
    async fn update(&self, person: &Person) -> Result<(), StorageError>;
    async fn delete(&self, id: i64) -> Result<(), StorageError>;
}
