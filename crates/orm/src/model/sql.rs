//! CRUD statement generation
//!
//! Pure builders turning model metadata plus a value list into
//! parameterized INSERT / UPDATE / DELETE statements. The value list
//! must be aligned index-for-index with `metadata.fields`.

use crate::error::{OrmError, OrmResult};
use crate::model::metadata::ModelMetadata;
use crate::value::Value;

fn check_alignment(metadata: &ModelMetadata, values: &[Value]) -> OrmResult<()> {
    if values.len() != metadata.fields.len() {
        return Err(OrmError::Query(format!(
            "model for table {} supplied {} values for {} fields",
            metadata.table,
            values.len(),
            metadata.fields.len()
        )));
    }
    Ok(())
}

/// INSERT statement skipping auto-increment primary key columns
pub fn insert_statement(
    metadata: &ModelMetadata,
    values: &[Value],
) -> OrmResult<(String, Vec<Value>)> {
    check_alignment(metadata, values)?;

    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut params = Vec::new();

    for (field, value) in metadata.fields.iter().zip(values) {
        if field.primary_key && field.auto_increment {
            continue;
        }
        columns.push(field.name.as_str());
        placeholders.push("?");
        params.push(value.clone());
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        metadata.table,
        columns.join(", "),
        placeholders.join(", ")
    );

    Ok((sql, params))
}

/// UPDATE of all non-key columns, keyed by the primary key
pub fn update_statement(
    metadata: &ModelMetadata,
    values: &[Value],
) -> OrmResult<(String, Vec<Value>)> {
    check_alignment(metadata, values)?;

    let pk_index = metadata
        .fields
        .iter()
        .position(|f| f.primary_key)
        .ok_or_else(|| OrmError::MissingPrimaryKey(metadata.table.clone()))?;

    let mut set_clauses = Vec::new();
    let mut params = Vec::new();

    for (field, value) in metadata.fields.iter().zip(values) {
        if field.primary_key {
            continue;
        }
        set_clauses.push(format!("{} = ?", field.name));
        params.push(value.clone());
    }

    let pk = &metadata.fields[pk_index];
    params.push(values[pk_index].clone());

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        metadata.table,
        set_clauses.join(", "),
        pk.name
    );

    Ok((sql, params))
}

/// DELETE keyed by the primary key
pub fn delete_statement(
    metadata: &ModelMetadata,
    values: &[Value],
) -> OrmResult<(String, Vec<Value>)> {
    check_alignment(metadata, values)?;

    let pk_index = metadata
        .fields
        .iter()
        .position(|f| f.primary_key)
        .ok_or_else(|| OrmError::MissingPrimaryKey(metadata.table.clone()))?;

    let pk = &metadata.fields[pk_index];
    let sql = format!("DELETE FROM {} WHERE {} = ?", metadata.table, pk.name);

    Ok((sql, vec![values[pk_index].clone()]))
}
