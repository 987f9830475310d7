//! Migration Runner - Applies pending migrations against the database
//!
//! The migrator owns the registered catalog, diffs it against the
//! ledger table, validates every pending operation up front, and
//! executes the whole pending set as one batch — inside a single
//! transaction unless the caller opts out.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::{OrmError, OrmResult};
use crate::migrations::definitions::{
    LedgerRecord, Migration, MigrationRunResult, MigrationStatus, MigrationStatusEntry,
    MigratorConfig, TransactionMode,
};
use crate::migrations::operations::{Column, Operation};

/// Orchestrates schema migrations against a SQLite database
///
/// Registration order does not matter; every call sorts a view of the
/// catalog by logical timestamp and leaves the registration list
/// untouched. The migrator provides no mutual exclusion — running
/// concurrent `up`/`down` calls against the same store is the caller's
/// responsibility to serialize.
pub struct Migrator {
    pool: SqlitePool,
    config: MigratorConfig,
    migrations: Vec<Migration>,
}

impl Migrator {
    /// Create a migrator with the default configuration
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_config(pool, MigratorConfig::default())
    }

    /// Create a migrator with an explicit ledger table name and column
    /// type allow-list
    pub fn with_config(pool: SqlitePool, config: MigratorConfig) -> Self {
        Self {
            pool,
            config,
            migrations: Vec::new(),
        }
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Add a migration to the catalog
    pub fn register(&mut self, migration: Migration) {
        self.migrations.push(migration);
    }

    /// The registered catalog, in registration order
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Run all pending migrations in one transaction
    pub async fn up(&self) -> OrmResult<MigrationRunResult> {
        self.up_with(TransactionMode::Transactional).await
    }

    /// Run all pending migrations with an explicit transaction mode
    ///
    /// The whole pending set is validated before anything executes and
    /// applied as one batch numbered `max(ledger.batch) + 1`. Under
    /// [`TransactionMode::Transactional`] either every pending
    /// migration is applied and recorded or none are. With nothing
    /// pending this is a no-op returning success.
    pub async fn up_with(&self, mode: TransactionMode) -> OrmResult<MigrationRunResult> {
        let start_time = Instant::now();

        self.ensure_ledger_table().await?;
        let records = self.applied_records().await?;
        let applied_ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();

        let pending: Vec<&Migration> = self
            .ordered_catalog()
            .into_iter()
            .filter(|m| !applied_ids.contains(m.id.as_str()))
            .collect();

        if pending.is_empty() {
            debug!("no pending migrations");
            return Ok(MigrationRunResult {
                applied_count: 0,
                applied_migrations: Vec::new(),
                skipped_count: applied_ids.len(),
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        // The whole pending set must be valid before any statement
        // runs, so a rejected type has no side effects even unguarded.
        for migration in &pending {
            self.validate_migration(migration)?;
        }

        let batch = self.next_batch_number().await?;
        debug!(
            "applying {} pending migration(s) as batch {}",
            pending.len(),
            batch
        );

        match mode {
            TransactionMode::Transactional => {
                let mut tx = self.pool.begin().await.map_err(|e| {
                    OrmError::Transaction(format!("Failed to begin migration transaction: {}", e))
                })?;
                self.apply_pending(&mut tx, &pending, batch).await?;
                tx.commit().await.map_err(|e| {
                    OrmError::Transaction(format!("Failed to commit migration batch {}: {}", batch, e))
                })?;
            }
            TransactionMode::Unguarded => {
                let mut conn = self.pool.acquire().await.map_err(|e| {
                    OrmError::Connection(format!("Failed to acquire connection: {}", e))
                })?;
                self.apply_pending(&mut conn, &pending, batch).await?;
            }
        }

        Ok(MigrationRunResult {
            applied_count: pending.len(),
            applied_migrations: pending.iter().map(|m| m.id.clone()).collect(),
            skipped_count: applied_ids.len(),
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Report every registered migration with its ledger state
    ///
    /// Sorted ascending by logical timestamp. Read-only apart from
    /// idempotent ledger table creation.
    pub async fn status(&self) -> OrmResult<Vec<MigrationStatusEntry>> {
        self.ensure_ledger_table().await?;
        let records = self.applied_records().await?;
        let by_id: HashMap<&str, &LedgerRecord> =
            records.iter().map(|r| (r.id.as_str(), r)).collect();

        Ok(self
            .ordered_catalog()
            .into_iter()
            .map(|migration| {
                let status = match by_id.get(migration.id.as_str()) {
                    Some(record) => MigrationStatus::Applied {
                        applied_at: record.applied,
                        batch: record.batch,
                    },
                    None => MigrationStatus::Pending,
                };
                MigrationStatusEntry {
                    id: migration.id.clone(),
                    name: migration.name.clone(),
                    timestamp: migration.timestamp,
                    status,
                }
            })
            .collect())
    }

    async fn apply_pending(
        &self,
        conn: &mut SqliteConnection,
        pending: &[&Migration],
        batch: i64,
    ) -> OrmResult<()> {
        let insert_sql = format!(
            "INSERT INTO {} (id, name, timestamp, applied, batch) VALUES (?, ?, ?, ?, ?)",
            self.config.ledger_table
        );

        for migration in pending {
            info!("applying migration: {} - {}", migration.id, migration.name);

            for operation in &migration.up {
                for statement in operation.statements() {
                    sqlx::query(&statement).execute(&mut *conn).await.map_err(|e| {
                        OrmError::Migration(format!(
                            "Failed to execute migration {}: {}",
                            migration.name, e
                        ))
                    })?;
                }
            }

            sqlx::query(&insert_sql)
                .bind(&migration.id)
                .bind(&migration.name)
                .bind(migration.timestamp.timestamp())
                .bind(Utc::now().timestamp())
                .bind(batch)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    OrmError::Migration(format!(
                        "Failed to record migration {}: {}",
                        migration.name, e
                    ))
                })?;
        }

        Ok(())
    }

    /// Create the ledger table if it does not exist
    pub(crate) async fn ensure_ledger_table(&self) -> OrmResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n\
             \tid TEXT PRIMARY KEY,\n\
             \tname TEXT NOT NULL,\n\
             \ttimestamp INTEGER NOT NULL,\n\
             \tapplied INTEGER NOT NULL,\n\
             \tbatch INTEGER NOT NULL DEFAULT 1\n\
             )",
            self.config.ledger_table
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| OrmError::Migration(format!("Failed to create ledger table: {}", e)))?;
        Ok(())
    }

    /// All ledger rows, ascending by logical timestamp
    pub(crate) async fn applied_records(&self) -> OrmResult<Vec<LedgerRecord>> {
        let sql = format!(
            "SELECT id, name, timestamp, applied, batch FROM {} ORDER BY timestamp ASC",
            self.config.ledger_table
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| OrmError::Migration(format!("Failed to read ledger: {}", e)))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp: i64 = row
                .try_get("timestamp")
                .map_err(|e| OrmError::Migration(format!("Failed to read ledger row: {}", e)))?;
            let applied: i64 = row
                .try_get("applied")
                .map_err(|e| OrmError::Migration(format!("Failed to read ledger row: {}", e)))?;
            records.push(LedgerRecord {
                id: row
                    .try_get("id")
                    .map_err(|e| OrmError::Migration(format!("Failed to read ledger row: {}", e)))?,
                name: row
                    .try_get("name")
                    .map_err(|e| OrmError::Migration(format!("Failed to read ledger row: {}", e)))?,
                timestamp: epoch_seconds(timestamp),
                applied: epoch_seconds(applied),
                batch: row
                    .try_get("batch")
                    .map_err(|e| OrmError::Migration(format!("Failed to read ledger row: {}", e)))?,
            });
        }
        Ok(records)
    }

    async fn next_batch_number(&self) -> OrmResult<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX(batch), 0) + 1 FROM {}",
            self.config.ledger_table
        );
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| OrmError::Migration(format!("Failed to compute next batch: {}", e)))?;
        row.try_get(0)
            .map_err(|e| OrmError::Migration(format!("Failed to compute next batch: {}", e)))
    }

    /// A stable timestamp-ordered view of the catalog; the registration
    /// list itself is never reordered
    pub(crate) fn ordered_catalog(&self) -> Vec<&Migration> {
        let mut ordered: Vec<&Migration> = self.migrations.iter().collect();
        ordered.sort_by_key(|m| m.timestamp);
        ordered
    }

    pub(crate) fn find_registered(&self, id: &str) -> Option<&Migration> {
        self.migrations.iter().find(|m| m.id == id)
    }

    fn validate_migration(&self, migration: &Migration) -> OrmResult<()> {
        for operation in &migration.up {
            match operation {
                Operation::CreateTable { columns, .. } => {
                    for column in columns {
                        self.validate_column(migration, column)?;
                    }
                }
                Operation::AddColumn { column, .. } => {
                    self.validate_column(migration, column)?;
                }
                Operation::ModifyColumn { new_column, .. } => {
                    self.validate_column(migration, new_column)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn validate_column(&self, migration: &Migration, column: &Column) -> OrmResult<()> {
        let allowed = self
            .config
            .allowed_column_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&column.sql_type));
        if !allowed {
            return Err(OrmError::InvalidColumnType {
                migration: migration.name.clone(),
                column: column.name.clone(),
                sql_type: column.sql_type.clone(),
            });
        }
        Ok(())
    }
}

pub(crate) fn epoch_seconds(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or(DateTime::UNIX_EPOCH)
}
