//! Storage access layer for person records.
//! - `storage` holds the backing collections (Postgres, JSON document file, in-memory mock).
//! - `person` holds the engine that serializes access and assigns identifiers.
//! - Errors are typed (`errors::StorageError`) so callers can tell not-found from store faults.

pub mod errors;
pub mod metrics;
pub mod storage;
pub mod person;
#[cfg(test)]
pub mod test_support;
