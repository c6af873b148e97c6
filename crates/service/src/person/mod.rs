//! Person storage engine.
//!
//! [`PersonStorage`] wraps one backing collection behind an engine-wide lock,
//! assigns identifiers per [`IdPolicy`] and bounds every round trip with a
//! deadline. Callers talk to it through the [`PersonStore`] contract.

pub mod id_policy;
pub mod storage;
pub mod store;

pub use id_policy::IdPolicy;
pub use models::Person;
pub use storage::{PersonStorage, StorageOptions, DEFAULT_OP_TIMEOUT};
pub use store::{PersonStore, ScanResult};
