use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::FromRow;

use crate::database::pool::DatabaseError;

/// Caller-supplied query shape for pagination: one predicate set backing both
/// the COUNT and the limit/offset data query.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl SelectQuery {
    pub fn from_table(table: &str) -> Result<Self, DatabaseError> {
        if !valid_identifier(table) {
            return Err(DatabaseError::Query(format!("invalid table name: {}", table)));
        }

        Ok(Self {
            table: table.to_string(),
            conditions: Vec::new(),
            params: Vec::new(),
        })
    }

    pub fn where_eq(mut self, column: &str, value: Value) -> Result<Self, DatabaseError> {
        check_column(column)?;
        self.params.push(value);
        self.conditions.push(format!("\"{}\" = ${}", column, self.params.len()));
        Ok(self)
    }

    pub fn where_like(mut self, column: &str, pattern: impl Into<String>) -> Result<Self, DatabaseError> {
        check_column(column)?;
        self.params.push(Value::String(pattern.into()));
        self.conditions.push(format!("\"{}\" LIKE ${}", column, self.params.len()));
        Ok(self)
    }

    pub fn where_in(mut self, column: &str, values: Vec<Value>) -> Result<Self, DatabaseError> {
        check_column(column)?;
        if values.is_empty() {
            return Err(DatabaseError::Query("IN predicate needs at least one value".to_string()));
        }

        let placeholders: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, _)| format!("${}", self.params.len() + i + 1))
            .collect();
        self.conditions
            .push(format!("\"{}\" IN ({})", column, placeholders.join(", ")));
        self.params.extend(values);
        Ok(self)
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) AS count FROM \"{}\"{}", self.table, self.where_clause())
    }

    pub fn data_sql(&self, order_by: Option<&OrderBy>, limit: i64, offset: i64) -> String {
        let order = match order_by {
            Some(order_by) => format!(" ORDER BY {}", order_by.to_sql()),
            None => String::new(),
        };

        format!(
            "SELECT * FROM \"{}\"{}{} LIMIT {} OFFSET {}",
            self.table,
            self.where_clause(),
            order,
            limit,
            offset
        )
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    column: String,
    direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: &str) -> Result<Self, DatabaseError> {
        check_column(column)?;
        Ok(Self { column: column.to_string(), direction: SortDirection::Asc })
    }

    pub fn desc(column: &str) -> Result<Self, DatabaseError> {
        check_column(column)?;
        Ok(Self { column: column.to_string(), direction: SortDirection::Desc })
    }

    fn to_sql(&self) -> String {
        let direction = match self.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        format!("\"{}\" {}", self.column, direction)
    }
}

/// Identifiers come from compile-time constants and struct field names, but
/// everything interpolated into SQL text is checked anyway.
pub(crate) fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_column(column: &str) -> Result<(), DatabaseError> {
    if valid_identifier(column) {
        Ok(())
    } else {
        Err(DatabaseError::Query(format!("invalid column name: {}", column)))
    }
}

pub(crate) fn insert_sql(table: &str, columns: &[(String, Value)]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO \"{}\" DEFAULT VALUES RETURNING *", table);
    }

    let names: Vec<String> = columns.iter().map(|(name, _)| format!("\"{}\"", name)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();

    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
        table,
        names.join(", "),
        placeholders.join(", ")
    )
}

pub(crate) fn update_sql(table: &str, pk_column: &str, columns: &[(String, Value)], bulk: bool) -> String {
    let mut assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("\"{}\" = ${}", name, i + 1))
        .collect();
    assignments.push("\"updated_at\" = now()".to_string());

    let predicate = if bulk {
        format!("= ANY(${})", columns.len() + 1)
    } else {
        format!("= ${}", columns.len() + 1)
    };

    format!(
        "UPDATE \"{}\" SET {} WHERE \"{}\" {}",
        table,
        assignments.join(", "),
        pk_column,
        predicate
    )
}

pub(crate) fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) => q.bind(v.clone()), // JSONB
        Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}

pub(crate) fn bind_value_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) => q.bind(v.clone()),
        Value::Object(_) => q.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_and_data_share_predicates() {
        let query = SelectQuery::from_table("users")
            .unwrap()
            .where_eq("user_role", json!("admin"))
            .unwrap();

        assert_eq!(
            query.count_sql(),
            "SELECT COUNT(*) AS count FROM \"users\" WHERE \"user_role\" = $1"
        );
        assert_eq!(
            query.data_sql(None, 50, 0),
            "SELECT * FROM \"users\" WHERE \"user_role\" = $1 LIMIT 50 OFFSET 0"
        );
        assert_eq!(query.params(), &[json!("admin")]);
    }

    #[test]
    fn order_by_is_appended_to_data_query_only() {
        let query = SelectQuery::from_table("users").unwrap();
        let order = OrderBy::desc("created_at").unwrap();

        assert_eq!(
            query.data_sql(Some(&order), 10, 20),
            "SELECT * FROM \"users\" ORDER BY \"created_at\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(query.count_sql(), "SELECT COUNT(*) AS count FROM \"users\"");
    }

    #[test]
    fn where_in_expands_placeholders() {
        let query = SelectQuery::from_table("users")
            .unwrap()
            .where_eq("user_role", json!("admin"))
            .unwrap()
            .where_in("id", vec![json!(1), json!(2), json!(3)])
            .unwrap();

        assert_eq!(
            query.count_sql(),
            "SELECT COUNT(*) AS count FROM \"users\" WHERE \"user_role\" = $1 AND \"id\" IN ($2, $3, $4)"
        );
        assert_eq!(query.params().len(), 4);
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        assert!(SelectQuery::from_table("users; DROP TABLE users").is_err());
        assert!(SelectQuery::from_table("users")
            .unwrap()
            .where_eq("role\"", json!("x"))
            .is_err());
        assert!(OrderBy::asc("1st").is_err());
    }

    #[test]
    fn insert_sql_shape() {
        let columns = vec![
            ("email".to_string(), json!("a@b.c")),
            ("user_role".to_string(), json!("user")),
        ];

        assert_eq!(
            insert_sql("users", &columns),
            "INSERT INTO \"users\" (\"email\", \"user_role\") VALUES ($1, $2) RETURNING *"
        );
        assert_eq!(
            insert_sql("users", &[]),
            "INSERT INTO \"users\" DEFAULT VALUES RETURNING *"
        );
    }

    #[test]
    fn update_sql_shape() {
        let columns = vec![("email".to_string(), json!("a@b.c"))];

        assert_eq!(
            update_sql("users", "id", &columns, false),
            "UPDATE \"users\" SET \"email\" = $1, \"updated_at\" = now() WHERE \"id\" = $2"
        );
        assert_eq!(
            update_sql("users", "id", &columns, true),
            "UPDATE \"users\" SET \"email\" = $1, \"updated_at\" = now() WHERE \"id\" = ANY($2)"
        );
    }
}
