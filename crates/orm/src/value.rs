//! SQL parameter values
//!
//! [`Value`] is the owned parameter representation shared by the CRUD
//! layer, the query builder, and operation parameter lists. Variants
//! mirror the SQLite storage classes.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sqlx::encode::{Encode, IsNull};
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo};
use sqlx::{Sqlite, Type};

/// An owned SQL parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Null,
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl Type<Sqlite> for Value {
    fn type_info() -> SqliteTypeInfo {
        <str as Type<Sqlite>>::type_info()
    }

    fn compatible(_ty: &SqliteTypeInfo) -> bool {
        true
    }
}

impl<'q> Encode<'q, Sqlite> for Value {
    fn encode_by_ref(&self, args: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
        match self {
            Value::Integer(v) => args.push(SqliteArgumentValue::Int64(*v)),
            Value::Real(v) => args.push(SqliteArgumentValue::Double(*v)),
            Value::Text(v) => args.push(SqliteArgumentValue::Text(Cow::Owned(v.clone()))),
            Value::Blob(v) => args.push(SqliteArgumentValue::Blob(Cow::Owned(v.clone()))),
            Value::Null => return IsNull::Yes,
        }
        IsNull::No
    }
}
