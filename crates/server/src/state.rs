use std::sync::Arc;

use service::person::PersonStore;

/// Shared handler state. The storage engine is the only mutable resource and
/// does its own locking.
#[derive(Clone)]
pub struct AppState {
    pub persons: Arc<dyn PersonStore>,
}

impl AppState {
    pub fn new(persons: Arc<dyn PersonStore>) -> Self {
        Self { persons }
    }
}
