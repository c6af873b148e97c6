//! Backing collections for the person storage engine
//!
//! Every backend implements [`collection::PersonCollection`]; the engine in
//! `crate::person` is the only caller and serializes access to it.

pub mod collection;
pub mod json_document_store;
pub mod seaorm;
pub mod mock;
