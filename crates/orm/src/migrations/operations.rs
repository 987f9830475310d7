//! Schema Operations - The closed set of migration operations
//!
//! Each variant renders to deterministic DDL text: identical field
//! values always produce byte-identical output, which golden tests
//! rely on. Rendering is pure; validation against the configured type
//! allow-list happens in the migrator before anything executes.

use serde::{Deserialize, Serialize};

use crate::model::{Model, ModelMetadata};
use crate::value::Value;

/// A table column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Storage type name, checked against the migrator's allow-list
    pub sql_type: String,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub nullable: bool,
    /// Metadata only; not rendered into DDL
    pub max_length: Option<u32>,
}

impl Column {
    /// Create a non-nullable column with no key flags set
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

/// A table index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl Index {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A foreign key constraint definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    /// CASCADE, SET NULL, RESTRICT, NO ACTION
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl ForeignKey {
    pub fn new(columns: &[&str], ref_table: &str, ref_columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ref_table: ref_table.to_string(),
            ref_columns: ref_columns.iter().map(|c| c.to_string()).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn on_delete(mut self, action: &str) -> Self {
        self.on_delete = Some(action.to_string());
        self
    }

    pub fn on_update(mut self, action: &str) -> Self {
        self.on_update = Some(action.to_string());
        self
    }
}

/// One schema-definition action with a deterministic textual rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    CreateTable {
        table: String,
        columns: Vec<Column>,
        foreign_keys: Vec<ForeignKey>,
        indexes: Vec<Index>,
    },
    DropTable {
        table: String,
    },
    AddColumn {
        table: String,
        column: Column,
    },
    DropColumn {
        table: String,
        column: String,
    },
    /// Renames a column; type changes in the new definition are not
    /// emitted
    ModifyColumn {
        table: String,
        old_column: String,
        new_column: Column,
    },
    CreateIndex {
        table: String,
        index: Index,
    },
    DropIndex {
        table: String,
        name: String,
    },
    AddForeignKey {
        table: String,
        foreign_key: ForeignKey,
    },
    DropForeignKey {
        table: String,
        constraint: String,
    },
}

impl Operation {
    /// Synthesize a CreateTable operation from model metadata
    pub fn create_table_from(metadata: &ModelMetadata) -> Operation {
        let columns = metadata
            .fields
            .iter()
            .map(|field| Column {
                name: field.name.clone(),
                sql_type: field.sql_type.clone(),
                primary_key: field.primary_key,
                auto_increment: field.auto_increment,
                nullable: field.nullable,
                max_length: field.max_length,
            })
            .collect();

        Operation::CreateTable {
            table: metadata.table.clone(),
            columns,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Synthesize a CreateTable operation for a model type
    pub fn create_table_for<M: Model>() -> Operation {
        Self::create_table_from(&M::metadata())
    }

    /// The discrete statements this operation executes, in order
    ///
    /// CreateTable yields the table statement followed by one statement
    /// per declared index; every other variant yields exactly one.
    pub fn statements(&self) -> Vec<String> {
        match self {
            Operation::CreateTable {
                table,
                columns,
                foreign_keys,
                indexes,
            } => {
                let mut clauses: Vec<String> = columns.iter().map(column_clause).collect();
                clauses.extend(foreign_keys.iter().map(foreign_key_clause));

                let mut statements = vec![format!(
                    "CREATE TABLE {} (\n\t{}\n)",
                    table,
                    clauses.join(",\n\t")
                )];
                statements.extend(indexes.iter().map(|idx| index_statement(table, idx)));
                statements
            }
            Operation::DropTable { table } => {
                vec![format!("DROP TABLE {}", table)]
            }
            Operation::AddColumn { table, column } => {
                let mut definition = format!("{} {}", column.name, column.sql_type);
                if !column.nullable {
                    definition.push_str(" NOT NULL");
                }
                vec![format!("ALTER TABLE {} ADD COLUMN {}", table, definition)]
            }
            Operation::DropColumn { table, column } => {
                vec![format!("ALTER TABLE {} DROP COLUMN {}", table, column)]
            }
            Operation::ModifyColumn {
                table,
                old_column,
                new_column,
            } => {
                vec![format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    table, old_column, new_column.name
                )]
            }
            Operation::CreateIndex { table, index } => {
                vec![index_statement(table, index)]
            }
            Operation::DropIndex { name, .. } => {
                vec![format!("DROP INDEX {}", name)]
            }
            Operation::AddForeignKey { table, foreign_key } => {
                let mut sql = format!(
                    "ALTER TABLE {} ADD CONSTRAINT {}_{}_fk FOREIGN KEY ({}) REFERENCES {} ({})",
                    table,
                    table,
                    foreign_key.columns.join("_"),
                    foreign_key.columns.join(", "),
                    foreign_key.ref_table,
                    foreign_key.ref_columns.join(", ")
                );
                if let Some(action) = &foreign_key.on_delete {
                    sql.push_str(&format!(" ON DELETE {}", action));
                }
                if let Some(action) = &foreign_key.on_update {
                    sql.push_str(&format!(" ON UPDATE {}", action));
                }
                vec![sql]
            }
            Operation::DropForeignKey { table, constraint } => {
                vec![format!("ALTER TABLE {} DROP CONSTRAINT {}", table, constraint)]
            }
        }
    }

    /// The full rendering; multi-statement operations join with `;\n`
    pub fn render(&self) -> String {
        self.statements().join(";\n")
    }

    /// Driver-level parameters; DDL text is inlined so this is empty
    /// for every variant
    pub fn parameters(&self) -> Vec<Value> {
        Vec::new()
    }
}

fn column_clause(column: &Column) -> String {
    let mut clause = format!("{} {}", column.name, column.sql_type);
    if column.primary_key {
        if column.auto_increment {
            clause.push_str(" PRIMARY KEY AUTOINCREMENT");
        } else {
            clause.push_str(" PRIMARY KEY");
        }
    } else if !column.nullable {
        clause.push_str(" NOT NULL");
    }
    clause
}

fn foreign_key_clause(foreign_key: &ForeignKey) -> String {
    let mut clause = format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        foreign_key.columns.join(", "),
        foreign_key.ref_table,
        foreign_key.ref_columns.join(", ")
    );
    if let Some(action) = &foreign_key.on_delete {
        clause.push_str(&format!(" ON DELETE {}", action));
    }
    if let Some(action) = &foreign_key.on_update {
        clause.push_str(&format!(" ON UPDATE {}", action));
    }
    clause
}

fn index_statement(table: &str, index: &Index) -> String {
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        index.name,
        table,
        index.columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldMetadata;

    #[test]
    fn test_create_table_rendering() {
        let op = Operation::CreateTable {
            table: "users".to_string(),
            columns: vec![
                Column::new("id", "INTEGER").primary_key().auto_increment(),
                Column::new("name", "TEXT"),
                Column::new("email", "TEXT").nullable(),
            ],
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        };

        assert_eq!(
            op.render(),
            "CREATE TABLE users (\n\tid INTEGER PRIMARY KEY AUTOINCREMENT,\n\tname TEXT NOT NULL,\n\temail TEXT\n)"
        );
    }

    #[test]
    fn test_primary_key_without_auto_increment() {
        let op = Operation::CreateTable {
            table: "settings".to_string(),
            columns: vec![Column::new("key", "TEXT").primary_key(), Column::new("value", "TEXT")],
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        };

        let sql = op.render();
        assert!(sql.contains("key TEXT PRIMARY KEY,"));
        // primary keys are never additionally marked NOT NULL
        assert!(!sql.contains("PRIMARY KEY NOT NULL"));
    }

    #[test]
    fn test_create_table_with_foreign_keys_and_indexes() {
        let op = Operation::CreateTable {
            table: "posts".to_string(),
            columns: vec![
                Column::new("id", "INTEGER").primary_key().auto_increment(),
                Column::new("user_id", "INTEGER"),
            ],
            foreign_keys: vec![ForeignKey::new(&["user_id"], "users", &["id"]).on_delete("CASCADE")],
            indexes: vec![Index::new("idx_posts_user_id", &["user_id"])],
        };

        assert_eq!(
            op.render(),
            "CREATE TABLE posts (\n\tid INTEGER PRIMARY KEY AUTOINCREMENT,\n\tuser_id INTEGER NOT NULL,\n\tFOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE\n);\nCREATE INDEX idx_posts_user_id ON posts (user_id)"
        );

        let statements = op.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE posts"));
        assert!(statements[1].starts_with("CREATE INDEX idx_posts_user_id"));
    }

    #[test]
    fn test_add_column_nullability() {
        let nullable = Operation::AddColumn {
            table: "users".to_string(),
            column: Column::new("email", "TEXT").nullable(),
        };
        assert_eq!(nullable.render(), "ALTER TABLE users ADD COLUMN email TEXT");

        let required = Operation::AddColumn {
            table: "users".to_string(),
            column: Column::new("email", "TEXT"),
        };
        assert_eq!(required.render(), "ALTER TABLE users ADD COLUMN email TEXT NOT NULL");
    }

    #[test]
    fn test_modify_column_renders_rename_only() {
        let op = Operation::ModifyColumn {
            table: "users".to_string(),
            old_column: "email".to_string(),
            new_column: Column::new("email_address", "TEXT").nullable(),
        };
        assert_eq!(
            op.render(),
            "ALTER TABLE users RENAME COLUMN email TO email_address"
        );
    }

    #[test]
    fn test_index_operations() {
        let create = Operation::CreateIndex {
            table: "users".to_string(),
            index: Index::new("idx_users_email", &["email"]).unique(),
        };
        assert_eq!(
            create.render(),
            "CREATE UNIQUE INDEX idx_users_email ON users (email)"
        );

        let drop = Operation::DropIndex {
            table: "users".to_string(),
            name: "idx_users_email".to_string(),
        };
        assert_eq!(drop.render(), "DROP INDEX idx_users_email");
    }

    #[test]
    fn test_foreign_key_operations() {
        let add = Operation::AddForeignKey {
            table: "posts".to_string(),
            foreign_key: ForeignKey::new(&["user_id"], "users", &["id"])
                .on_delete("SET NULL")
                .on_update("CASCADE"),
        };
        assert_eq!(
            add.render(),
            "ALTER TABLE posts ADD CONSTRAINT posts_user_id_fk FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE SET NULL ON UPDATE CASCADE"
        );

        let drop = Operation::DropForeignKey {
            table: "posts".to_string(),
            constraint: "posts_user_id_fk".to_string(),
        };
        assert_eq!(drop.render(), "ALTER TABLE posts DROP CONSTRAINT posts_user_id_fk");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let op = Operation::CreateTable {
            table: "users".to_string(),
            columns: vec![Column::new("id", "INTEGER").primary_key()],
            foreign_keys: Vec::new(),
            indexes: vec![Index::new("idx_users_id", &["id"])],
        };
        assert_eq!(op.render(), op.render());
    }

    #[test]
    fn test_parameters_are_empty() {
        let op = Operation::DropTable {
            table: "users".to_string(),
        };
        assert!(op.parameters().is_empty());
    }

    #[test]
    fn test_create_table_from_metadata() {
        let metadata = ModelMetadata::new("users")
            .field(FieldMetadata::new("id", "INTEGER").primary_key().auto_increment())
            .field(FieldMetadata::new("name", "TEXT"));

        let op = Operation::create_table_from(&metadata);
        assert_eq!(
            op.render(),
            "CREATE TABLE users (\n\tid INTEGER PRIMARY KEY AUTOINCREMENT,\n\tname TEXT NOT NULL\n)"
        );
    }

    #[test]
    fn test_create_table_for_model() {
        struct Counter {
            value: i64,
        }

        impl Model for Counter {
            fn metadata() -> ModelMetadata {
                ModelMetadata::new("counters").field(FieldMetadata::new("value", "INTEGER"))
            }

            fn values(&self) -> Vec<Value> {
                vec![Value::Integer(self.value)]
            }
        }

        let op = Operation::create_table_for::<Counter>();
        assert_eq!(op.render(), "CREATE TABLE counters (\n\tvalue INTEGER NOT NULL\n)");
    }
}
