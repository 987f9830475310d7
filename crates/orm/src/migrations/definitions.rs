//! Migration Definitions - Core types for the migration system
//!
//! Defines the Migration value object, the persisted ledger record,
//! status and result reports, and the migrator configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::migrations::operations::Operation;

/// A named, timestamped pair of forward and backward operation
/// sequences
///
/// The id must be unique across the catalog; [`Migration::new`] derives
/// it from the creation instant and the name. The logical timestamp
/// defines the total order in which migrations apply — callers should
/// avoid ties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub up: Vec<Operation>,
    /// Conventionally the semantic inverse of `up`; not verified
    pub down: Vec<Operation>,
}

impl Migration {
    /// Create a migration stamped with the current instant
    pub fn new(name: &str) -> Self {
        Self::at(name, Utc::now())
    }

    /// Create a migration with an explicit logical timestamp
    pub fn at(name: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}_{}", timestamp.timestamp(), name),
            name: name.to_string(),
            timestamp,
            up: Vec::new(),
            down: Vec::new(),
        }
    }

    pub fn with_up(mut self, operation: Operation) -> Self {
        self.up.push(operation);
        self
    }

    pub fn with_down(mut self, operation: Operation) -> Self {
        self.down.push(operation);
        self
    }
}

/// One row of the ledger table: a fully-applied migration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: String,
    /// Denormalized from the migration
    pub name: String,
    /// Denormalized logical timestamp, so ordering can be recomputed
    /// without the in-memory catalog
    pub timestamp: DateTime<Utc>,
    pub applied: DateTime<Utc>,
    pub batch: i64,
}

/// A migration's state relative to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationStatus {
    /// No ledger row; the migration has not been applied
    Pending,
    /// Fully applied
    Applied {
        applied_at: DateTime<Utc>,
        batch: i64,
    },
}

/// One entry of the status report, per registered migration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationStatusEntry {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub status: MigrationStatus,
}

/// Result of running pending migrations
#[derive(Debug)]
pub struct MigrationRunResult {
    /// Number of migrations that were applied
    pub applied_count: usize,
    /// IDs of migrations that were applied
    pub applied_migrations: Vec<String>,
    /// Number of migrations that were skipped (already applied)
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of rolling back a batch
#[derive(Debug)]
pub struct RollbackResult {
    /// Number of migrations that were rolled back
    pub rolled_back_count: usize,
    /// IDs of migrations that were rolled back
    pub rolled_back_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Whether a call runs inside a single all-or-nothing transaction or
/// executes statements directly
///
/// `Unguarded` exists for stores without transactional DDL; it
/// forfeits the atomicity guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    Transactional,
    Unguarded,
}

/// Configuration for the migrator
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Name of the ledger table recording applied migrations
    pub ledger_table: String,
    /// Column type allow-list, matched case-insensitively
    pub allowed_column_types: Vec<String>,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            ledger_table: "migrations".to_string(),
            allowed_column_types: vec![
                "INTEGER".to_string(),
                "TEXT".to_string(),
                "REAL".to_string(),
                "BLOB".to_string(),
                "NULL".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_migration_id_derived_from_timestamp_and_name() {
        let timestamp = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let migration = Migration::at("create_users", timestamp);
        assert_eq!(migration.id, "1700000000_create_users");
        assert_eq!(migration.name, "create_users");
        assert!(migration.up.is_empty());
        assert!(migration.down.is_empty());
    }

    #[test]
    fn test_default_config_allow_list() {
        let config = MigratorConfig::default();
        assert_eq!(config.ledger_table, "migrations");
        for sql_type in ["INTEGER", "TEXT", "REAL", "BLOB", "NULL"] {
            assert!(config.allowed_column_types.iter().any(|t| t == sql_type));
        }
    }
}
