//! Query Builder - Core builder implementation

use crate::value::Value;

/// Fluent builder for SELECT statements
///
/// Produces a SQL string plus positional parameter list via
/// [`QueryBuilder::build`]. Conditions are AND-joined; LIMIT and
/// OFFSET render only when positive.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    table: String,
    columns: Vec<String>,
    conditions: Vec<String>,
    params: Vec<Value>,
    order_by: Option<String>,
    limit: i64,
    offset: i64,
}

impl QueryBuilder {
    /// Start a query against the given table
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    /// Set the selected columns; an empty selection renders `*`
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a WHERE condition with its positional parameters
    pub fn filter(mut self, condition: &str, params: Vec<Value>) -> Self {
        self.conditions.push(condition.to_string());
        self.params.extend(params);
        self
    }

    pub fn order_by(mut self, expr: &str) -> Self {
        self.order_by = Some(expr.to_string());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Render the statement and return it with its parameters
    pub fn build(&self) -> (String, Vec<Value>) {
        let mut sql = String::from("SELECT ");

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }

        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }

        if self.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", self.limit));
        }

        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }

        (sql, self.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_star_by_default() {
        let (sql, params) = QueryBuilder::table("users").build();
        assert_eq!(sql, "SELECT * FROM users");
        assert!(params.is_empty());
    }

    #[test]
    fn test_conditions_joined_with_and() {
        let (sql, params) = QueryBuilder::table("users")
            .select(&["id", "name"])
            .filter("age > ?", vec![Value::Integer(21)])
            .filter("name LIKE ?", vec![Value::Text("a%".to_string())])
            .build();

        assert_eq!(
            sql,
            "SELECT id, name FROM users WHERE age > ? AND name LIKE ?"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_order_limit_offset() {
        let (sql, _) = QueryBuilder::table("users")
            .order_by("name ASC")
            .limit(10)
            .offset(20)
            .build();

        assert_eq!(sql, "SELECT * FROM users ORDER BY name ASC LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_zero_limit_not_rendered() {
        let (sql, _) = QueryBuilder::table("users").limit(0).build();
        assert_eq!(sql, "SELECT * FROM users");
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = QueryBuilder::table("users")
            .filter("id = ?", vec![Value::Integer(1)])
            .order_by("id");
        assert_eq!(builder.build(), builder.build());
    }
}
