//! Database Connection - Pool setup and CRUD execution
//!
//! Wraps a SQLite connection pool and builds the model-level CRUD
//! operations on top of metadata-driven statement generation. Query
//! results hydrate through `sqlx::FromRow`.

use std::time::Duration;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::FromRow;
use tracing::debug;

use crate::error::{OrmError, OrmResult};
use crate::model::{sql as model_sql, Model};
use crate::query::QueryBuilder;
use crate::transaction::Transaction;
use crate::value::Value;

/// Connection configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g. `sqlite://app.db?mode=rwc`)
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl DatabaseConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// In-memory database on a single connection, so every handle sees
    /// the same data
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        }
    }
}

/// A database handle over a SQLite connection pool
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool with the given configuration
    pub async fn connect(config: &DatabaseConfig) -> OrmResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| {
                OrmError::Connection(format!("Failed to connect to {}: {}", config.url, e))
            })?;
        debug!("connected to {}", config.url);
        Ok(Self { pool })
    }

    /// Open a pool with default settings for the given URL
    pub async fn connect_url(url: &str) -> OrmResult<Self> {
        Self::connect(&DatabaseConfig::new(url)).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Begin a transaction on this database
    pub async fn begin(&self) -> OrmResult<Transaction> {
        Transaction::begin(self).await
    }

    /// Execute a statement and return the affected-row count
    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> OrmResult<u64> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = query.bind(value);
        }
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| OrmError::Database(format!("Failed to execute statement: {}", e)))?;
        Ok(result.rows_affected())
    }

    /// Run a query and hydrate the result rows
    pub async fn find<M>(&self, sql: &str, params: Vec<Value>) -> OrmResult<Vec<M>>
    where
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut query = sqlx::query_as::<_, M>(sql);
        for value in params {
            query = query.bind(value);
        }
        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| OrmError::Query(format!("Failed to run query: {}", e)))
    }

    /// Build and run a query from a [`QueryBuilder`]
    pub async fn find_with<M>(&self, builder: &QueryBuilder) -> OrmResult<Vec<M>>
    where
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let (sql, params) = builder.build();
        self.find(&sql, params).await
    }

    /// Insert a model row
    ///
    /// Auto-increment primary key columns are skipped in the statement;
    /// on success the generated row id is written back through
    /// [`Model::set_auto_increment_id`].
    pub async fn create<M: Model>(&self, model: &mut M) -> OrmResult<()> {
        let metadata = M::metadata();
        let (sql, params) = model_sql::insert_statement(&metadata, &model.values())?;

        let mut query = sqlx::query(&sql);
        for value in params {
            query = query.bind(value);
        }
        let result = query.execute(&self.pool).await.map_err(|e| {
            OrmError::Database(format!("Failed to insert into {}: {}", metadata.table, e))
        })?;

        if metadata.has_auto_increment_key() {
            model.set_auto_increment_id(result.last_insert_rowid());
        }
        Ok(())
    }

    /// Update a model row keyed by its primary key
    pub async fn update<M: Model>(&self, model: &M) -> OrmResult<u64> {
        let metadata = M::metadata();
        let (sql, params) = model_sql::update_statement(&metadata, &model.values())?;
        self.execute_crud(&sql, params, &metadata.table).await
    }

    /// Delete a model row keyed by its primary key
    pub async fn delete<M: Model>(&self, model: &M) -> OrmResult<u64> {
        let metadata = M::metadata();
        let (sql, params) = model_sql::delete_statement(&metadata, &model.values())?;
        self.execute_crud(&sql, params, &metadata.table).await
    }

    async fn execute_crud(&self, sql: &str, params: Vec<Value>, table: &str) -> OrmResult<u64> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = query.bind(value);
        }
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| OrmError::Database(format!("Failed to write to {}: {}", table, e)))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldMetadata, ModelMetadata};

    #[derive(Debug, PartialEq, sqlx::FromRow)]
    struct User {
        id: i64,
        name: String,
        email: Option<String>,
    }

    impl Model for User {
        fn metadata() -> ModelMetadata {
            ModelMetadata::new("users")
                .field(FieldMetadata::new("id", "INTEGER").primary_key().auto_increment())
                .field(FieldMetadata::new("name", "TEXT"))
                .field(FieldMetadata::new("email", "TEXT").nullable())
        }

        fn values(&self) -> Vec<Value> {
            vec![
                Value::Integer(self.id),
                Value::Text(self.name.clone()),
                self.email.clone().into(),
            ]
        }

        fn set_auto_increment_id(&mut self, id: i64) {
            self.id = id;
        }
    }

    async fn memory_database() -> Database {
        let database = Database::connect(&DatabaseConfig::in_memory()).await.unwrap();
        database
            .execute(
                "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, email TEXT)",
                Vec::new(),
            )
            .await
            .unwrap();
        database
    }

    #[tokio::test]
    async fn test_create_writes_back_generated_id() {
        let database = memory_database().await;

        let mut user = User {
            id: 0,
            name: "ada".to_string(),
            email: None,
        };
        database.create(&mut user).await.unwrap();
        assert_eq!(user.id, 1);

        let mut second = User {
            id: 0,
            name: "grace".to_string(),
            email: Some("grace@example.com".to_string()),
        };
        database.create(&mut second).await.unwrap();
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_find_update_delete_round_trip() {
        let database = memory_database().await;

        let mut user = User {
            id: 0,
            name: "ada".to_string(),
            email: Some("ada@example.com".to_string()),
        };
        database.create(&mut user).await.unwrap();

        let found: Vec<User> = database
            .find("SELECT id, name, email FROM users WHERE id = ?", vec![Value::Integer(user.id)])
            .await
            .unwrap();
        assert_eq!(found, vec![User {
            id: user.id,
            name: "ada".to_string(),
            email: Some("ada@example.com".to_string()),
        }]);

        user.name = "ada lovelace".to_string();
        assert_eq!(database.update(&user).await.unwrap(), 1);

        assert_eq!(database.delete(&user).await.unwrap(), 1);
        let remaining: Vec<User> = database
            .find("SELECT id, name, email FROM users", Vec::new())
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_find_with_builder() {
        let database = memory_database().await;
        for name in ["ada", "grace", "alan"] {
            let mut user = User {
                id: 0,
                name: name.to_string(),
                email: None,
            };
            database.create(&mut user).await.unwrap();
        }

        let builder = QueryBuilder::table("users")
            .select(&["id", "name", "email"])
            .filter("name LIKE ?", vec![Value::Text("a%".to_string())])
            .order_by("name ASC");

        let users: Vec<User> = database.find_with(&builder).await.unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["ada", "alan"]);
    }
}
