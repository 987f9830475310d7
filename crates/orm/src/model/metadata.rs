//! Model Metadata - Column descriptions for record types
//!
//! A model describes itself as a table name plus an ordered field list;
//! each field carries a storage column name, a storage type name, and
//! primary-key / auto-increment / nullable flags. This is the input for
//! CRUD statement generation and create-table migration synthesis.

use serde::{Deserialize, Serialize};

/// Metadata for one model field, mapping it to a storage column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Storage column name
    pub name: String,
    /// Storage type name (e.g. `INTEGER`, `TEXT`)
    pub sql_type: String,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub nullable: bool,
    pub max_length: Option<u32>,
}

impl FieldMetadata {
    /// Create a non-nullable field with no key flags set
    pub fn new(name: &str, sql_type: &str) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            primary_key: false,
            auto_increment: false,
            nullable: false,
            max_length: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn max_length(mut self, length: u32) -> Self {
        self.max_length = Some(length);
        self
    }
}

/// Metadata for a model: table name plus ordered field list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub table: String,
    pub fields: Vec<FieldMetadata>,
}

impl ModelMetadata {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            fields: Vec::new(),
        }
    }

    /// Append a field, preserving declaration order
    pub fn field(mut self, field: FieldMetadata) -> Self {
        self.fields.push(field);
        self
    }

    /// The first field flagged as primary key, if any
    pub fn primary_key(&self) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Whether the model has an auto-increment primary key
    pub fn has_auto_increment_key(&self) -> bool {
        self.fields.iter().any(|f| f.primary_key && f.auto_increment)
    }
}
