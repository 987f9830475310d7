//! Model System - Record types mapped to storage columns
//!
//! A type participates in the CRUD layer by implementing [`Model`]:
//! it returns its [`ModelMetadata`] (table name plus ordered column
//! descriptions) and a value list aligned with that field order.
//! Hydration of query results goes through `sqlx::FromRow` instead of
//! a mirror trait.

pub mod metadata;
pub mod sql;

pub use metadata::{FieldMetadata, ModelMetadata};

use crate::value::Value;

/// A record type mapped to a database table
pub trait Model {
    /// Table name plus ordered field metadata
    fn metadata() -> ModelMetadata;

    /// Current field values, aligned index-for-index with
    /// `metadata().fields`
    fn values(&self) -> Vec<Value>;

    /// Called after a successful insert with the generated row id when
    /// the model declares an auto-increment primary key
    fn set_auto_increment_id(&mut self, _id: i64) {}
}
