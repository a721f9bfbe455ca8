use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::{PgHasArrayType, PgRow};
use sqlx::{FromRow, Postgres};

use crate::database::pool::DatabaseError;
use crate::database::query::valid_identifier;

/// Capability trait for records managed by a [`Repository`].
///
/// Each record type declares its table and primary-key column at compile
/// time; the repository never inspects rows to discover either.
///
/// [`Repository`]: crate::database::Repository
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize {
    /// Scalar primary-key type. The array bound covers `= ANY($1)` bulk
    /// lookups.
    type Key: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + PgHasArrayType + Send + Sync;

    const TABLE: &'static str;

    fn primary_key_column() -> &'static str {
        "id"
    }
}

/// Flattens a serializable input into `(column, value)` pairs for INSERT and
/// UPDATE statements. With `partial` set, null fields are treated as absent
/// and keep their stored values.
pub fn input_columns(input: &impl Serialize, partial: bool) -> Result<Vec<(String, Value)>, DatabaseError> {
    let value = serde_json::to_value(input)
        .map_err(|e| DatabaseError::Query(format!("input serialization failed: {}", e)))?;

    let Value::Object(fields) = value else {
        return Err(DatabaseError::Query("input must serialize to an object".to_string()));
    };

    let columns: Vec<(String, Value)> = fields
        .into_iter()
        .filter(|(_, v)| !(partial && v.is_null()))
        .collect();

    for (name, _) in &columns {
        if !valid_identifier(name) {
            return Err(DatabaseError::Query(format!("invalid column name: {}", name)));
        }
    }

    Ok(columns)
}
