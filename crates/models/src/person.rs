use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors;

/// A stored person document. `id` is assigned by the storage engine on insert
/// and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "persons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub name: String,
    pub address: String,
    pub work: String,
    pub age: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub type Person = Model;

impl Model {
    /// A person that has not been stored yet; the id is a placeholder until insert.
    pub fn new(name: impl Into<String>, address: impl Into<String>, work: impl Into<String>, age: i32) -> Self {
        Self { id: 0, name: name.into(), address: address.into(), work: work.into(), age }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
}

pub fn validate_required_text(field: &str, value: &str) -> Result<(), errors::ModelError> {
    if value.is_empty() {
        return Err(errors::ModelError::Validation(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_age(age: i32) -> Result<(), errors::ModelError> {
    // zero is the "missing" value for a required integer
    if age == 0 {
        return Err(errors::ModelError::Validation("age is required".into()));
    }
    if age < 0 {
        return Err(errors::ModelError::Validation("age must not be negative".into()));
    }
    Ok(())
}

/// Check every required field of an incoming person payload.
pub fn validate_input(name: &str, address: &str, work: &str, age: i32) -> Result<(), errors::ModelError> {
    validate_required_text("name", name)?;
    validate_required_text("address", address)?;
    validate_required_text("work", work)?;
    validate_age(age)
}
