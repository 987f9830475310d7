//! Migration System
//!
//! Tracks and applies versioned schema changes. Callers register
//! [`Migration`] values with a [`Migrator`]; pending migrations apply
//! as one atomic batch, and the most recent batch can be rolled back
//! atomically. Applied migrations are recorded in a ledger table.

pub mod definitions;
pub mod operations;
mod rollback;
pub mod runner;

pub use definitions::{
    LedgerRecord, Migration, MigrationRunResult, MigrationStatus, MigrationStatusEntry,
    MigratorConfig, RollbackResult, TransactionMode,
};
pub use operations::{Column, ForeignKey, Index, Operation};
pub use runner::Migrator;
