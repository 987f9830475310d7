//! Transaction Management
//!
//! An owned transaction handle with explicit commit and rollback.
//! Dropping an active handle logs a warning; the underlying driver
//! rolls the transaction back.

use sqlx::sqlite::SqliteRow;
use sqlx::Sqlite;
use tracing::{debug, warn};

use crate::database::Database;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// An in-progress database transaction
pub struct Transaction {
    inner: Option<sqlx::Transaction<'static, Sqlite>>,
}

impl Transaction {
    /// Begin a transaction on the database's pool
    pub async fn begin(database: &Database) -> OrmResult<Self> {
        let inner = database.pool().begin().await.map_err(|e| {
            OrmError::Transaction(format!("Failed to begin transaction: {}", e))
        })?;
        debug!("transaction started");
        Ok(Self { inner: Some(inner) })
    }

    /// Execute a statement within the transaction
    pub async fn execute(&mut self, sql: &str, params: Vec<Value>) -> OrmResult<u64> {
        let tx = self
            .inner
            .as_mut()
            .ok_or_else(|| OrmError::Transaction("No transaction in progress".to_string()))?;

        let mut query = sqlx::query(sql);
        for value in params {
            query = query.bind(value);
        }
        let result = query
            .execute(&mut **tx)
            .await
            .map_err(|e| OrmError::Database(format!("Failed to execute statement: {}", e)))?;
        Ok(result.rows_affected())
    }

    /// Run a query within the transaction and return the raw rows
    pub async fn fetch_all(&mut self, sql: &str, params: Vec<Value>) -> OrmResult<Vec<SqliteRow>> {
        let tx = self
            .inner
            .as_mut()
            .ok_or_else(|| OrmError::Transaction("No transaction in progress".to_string()))?;

        let mut query = sqlx::query(sql);
        for value in params {
            query = query.bind(value);
        }
        query
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| OrmError::Query(format!("Failed to run query: {}", e)))
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> OrmResult<()> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| OrmError::Transaction("No transaction in progress".to_string()))?;
        tx.commit()
            .await
            .map_err(|e| OrmError::Transaction(format!("Failed to commit transaction: {}", e)))?;
        debug!("transaction committed");
        Ok(())
    }

    /// Roll the transaction back
    pub async fn rollback(mut self) -> OrmResult<()> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| OrmError::Transaction("No transaction in progress".to_string()))?;
        tx.rollback()
            .await
            .map_err(|e| OrmError::Transaction(format!("Failed to rollback transaction: {}", e)))?;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Whether the transaction is still open
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.inner.is_some() {
            warn!("transaction dropped without commit or rollback; rolling back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseConfig;
    use sqlx::Row;

    async fn memory_database() -> Database {
        let database = Database::connect(&DatabaseConfig::in_memory()).await.unwrap();
        database
            .execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)", Vec::new())
            .await
            .unwrap();
        database
    }

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let database = memory_database().await;

        let mut tx = database.begin().await.unwrap();
        tx.execute(
            "INSERT INTO notes (body) VALUES (?)",
            vec![Value::Text("kept".to_string())],
        )
        .await
        .unwrap();
        assert!(tx.is_active());
        tx.commit().await.unwrap();

        let rows = database
            .find::<(i64, String)>("SELECT id, body FROM notes", Vec::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, "kept");
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let database = memory_database().await;

        let mut tx = database.begin().await.unwrap();
        tx.execute(
            "INSERT INTO notes (body) VALUES (?)",
            vec![Value::Text("discarded".to_string())],
        )
        .await
        .unwrap();

        let rows = tx.fetch_all("SELECT body FROM notes", Vec::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        let body: String = rows[0].try_get("body").unwrap();
        assert_eq!(body, "discarded");

        tx.rollback().await.unwrap();

        let rows = database
            .find::<(i64, String)>("SELECT id, body FROM notes", Vec::new())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
