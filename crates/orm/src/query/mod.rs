//! Query building
//!
//! A small fluent layer over SQL string assembly; execution lives on
//! [`crate::database::Database`].

pub mod builder;

pub use builder::QueryBuilder;
