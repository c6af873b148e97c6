//! Shared building blocks for the person registry crates.
//! - Logging bootstrap (`utils::logging`)
//! - Runtime directory checks (`env`)
//! - Small wire types shared by binaries and the HTTP layer (`types`)

pub mod types;
pub mod utils;
pub mod env;
