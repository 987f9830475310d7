//! Migration Rollback - Undoes the most recent batch
//!
//! Rollback is scoped to exactly one batch: the rows sharing the
//! highest batch number. Every row is resolved to a registered
//! migration before anything executes, so an orphaned ledger row fails
//! the call with no side effects.

use std::time::Instant;

use sqlx::sqlite::SqliteConnection;
use tracing::{debug, info};

use crate::error::{OrmError, OrmResult};
use crate::migrations::definitions::{LedgerRecord, Migration, RollbackResult, TransactionMode};
use crate::migrations::runner::Migrator;

impl Migrator {
    /// Roll back the most recent batch in one transaction
    pub async fn down(&self) -> OrmResult<RollbackResult> {
        self.down_with(TransactionMode::Transactional).await
    }

    /// Roll back the most recent batch with an explicit transaction
    /// mode
    ///
    /// Migrations in the batch run their down sequences in descending
    /// logical-timestamp order and their ledger rows are deleted.
    /// Earlier batches are never touched. An empty ledger is a no-op
    /// returning success.
    pub async fn down_with(&self, mode: TransactionMode) -> OrmResult<RollbackResult> {
        let start_time = Instant::now();

        self.ensure_ledger_table().await?;
        let records = self.applied_records().await?;

        if records.is_empty() {
            debug!("ledger is empty; nothing to roll back");
            return Ok(RollbackResult {
                rolled_back_count: 0,
                rolled_back_migrations: Vec::new(),
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        let target_batch = records.iter().map(|r| r.batch).max().unwrap_or(0);

        // records are ascending by timestamp; reversing gives the
        // required descending rollback order
        let mut plan: Vec<(&LedgerRecord, &Migration)> = Vec::new();
        for record in records.iter().rev().filter(|r| r.batch == target_batch) {
            let migration = self
                .find_registered(&record.id)
                .ok_or_else(|| OrmError::MigrationNotFound(record.id.clone()))?;
            plan.push((record, migration));
        }

        debug!(
            "rolling back batch {} ({} migration(s))",
            target_batch,
            plan.len()
        );

        match mode {
            TransactionMode::Transactional => {
                let mut tx = self.pool().begin().await.map_err(|e| {
                    OrmError::Transaction(format!("Failed to begin rollback transaction: {}", e))
                })?;
                self.rollback_plan(&mut tx, &plan).await?;
                tx.commit().await.map_err(|e| {
                    OrmError::Transaction(format!(
                        "Failed to commit rollback of batch {}: {}",
                        target_batch, e
                    ))
                })?;
            }
            TransactionMode::Unguarded => {
                let mut conn = self.pool().acquire().await.map_err(|e| {
                    OrmError::Connection(format!("Failed to acquire connection: {}", e))
                })?;
                self.rollback_plan(&mut conn, &plan).await?;
            }
        }

        Ok(RollbackResult {
            rolled_back_count: plan.len(),
            rolled_back_migrations: plan.iter().map(|(r, _)| r.id.clone()).collect(),
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    async fn rollback_plan(
        &self,
        conn: &mut SqliteConnection,
        plan: &[(&LedgerRecord, &Migration)],
    ) -> OrmResult<()> {
        let delete_sql = format!("DELETE FROM {} WHERE id = ?", self.config().ledger_table);

        for (record, migration) in plan {
            info!("rolling back migration: {} - {}", migration.id, migration.name);

            for operation in &migration.down {
                for statement in operation.statements() {
                    sqlx::query(&statement).execute(&mut *conn).await.map_err(|e| {
                        OrmError::Migration(format!(
                            "Failed to roll back migration {}: {}",
                            migration.name, e
                        ))
                    })?;
                }
            }

            sqlx::query(&delete_sql)
                .bind(&record.id)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    OrmError::Migration(format!(
                        "Failed to remove ledger row for {}: {}",
                        migration.name, e
                    ))
                })?;
        }

        Ok(())
    }
}
