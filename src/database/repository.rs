use serde::Serialize;
use sqlx::error::DatabaseError as _;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::api::pagination::{total_pages, PaginatedData, PaginationParams};
use crate::database::entity::{input_columns, Entity};
use crate::database::pool::DatabaseError;
use crate::database::query::{bind_value, bind_value_as, insert_sql, update_sql, OrderBy, SelectQuery};

/// Generic CRUD and pagination façade over the record store.
///
/// Each call binds to exactly one session/transaction; no state is held
/// between calls beyond the injected pool.
pub struct Repository<T: Entity> {
    pool: PgPool,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: std::marker::PhantomData,
        }
    }

    fn select_by_pk_sql() -> String {
        format!(
            "SELECT * FROM \"{}\" WHERE \"{}\" = $1",
            T::TABLE,
            T::primary_key_column()
        )
    }

    fn select_by_pks_sql() -> String {
        format!(
            "SELECT * FROM \"{}\" WHERE \"{}\" = ANY($1)",
            T::TABLE,
            T::primary_key_column()
        )
    }

    fn not_found() -> DatabaseError {
        DatabaseError::NotFound("Object not found".to_string())
    }

    /// Inserts a new record from the input's non-null fields; columns the
    /// input omits take their store defaults. A uniqueness violation rolls
    /// the transaction back and never partially commits.
    pub async fn create(&self, input: &impl Serialize) -> Result<T, DatabaseError> {
        let columns = input_columns(input, true)?;
        let sql = insert_sql(T::TABLE, &columns);

        let mut tx = self.pool.begin().await?;

        let mut insert = sqlx::query_as::<_, T>(&sql);
        for (_, value) in &columns {
            insert = bind_value_as(insert, value);
        }

        let created = match insert.fetch_one(&mut *tx).await {
            Ok(record) => record,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tx.rollback().await?;
                return Err(DatabaseError::Conflict("duplicate unique value".to_string()));
            }
            Err(other) => {
                tx.rollback().await?;
                return Err(other.into());
            }
        };

        tx.commit().await?;
        Ok(created)
    }

    pub async fn retrieve(&self, pk: &T::Key) -> Result<T, DatabaseError> {
        let sql = Self::select_by_pk_sql();

        sqlx::query_as::<_, T>(&sql)
            .bind(pk)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(Self::not_found)
    }

    /// Fetches all requested records. Any missing key fails the whole call;
    /// this never returns a partial list.
    pub async fn bulk_retrieve(&self, pks: &[T::Key]) -> Result<Vec<T>, DatabaseError> {
        if pks.is_empty() {
            return Ok(Vec::new());
        }

        let sql = Self::select_by_pks_sql();
        let records = sqlx::query_as::<_, T>(&sql)
            .bind(pks)
            .fetch_all(&self.pool)
            .await?;

        if records.len() != pks.len() {
            return Err(Self::not_found());
        }

        Ok(records)
    }

    /// Applies the input to an existing record. With `partial` set, only
    /// non-null input fields are written.
    ///
    /// Returns the record state read before the UPDATE ran, not the written
    /// row; callers that need the post-write state must `retrieve` again.
    pub async fn update(&self, pk: &T::Key, input: &impl Serialize, partial: bool) -> Result<T, DatabaseError> {
        let columns = input_columns(input, partial)?;
        let sql = update_sql(T::TABLE, T::primary_key_column(), &columns, false);
        let select_sql = Self::select_by_pk_sql();

        let mut tx = self.pool.begin().await?;

        let snapshot = sqlx::query_as::<_, T>(&select_sql)
            .bind(pk)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(Self::not_found)?;

        let mut update = sqlx::query(&sql);
        for (_, value) in &columns {
            update = bind_value(update, value);
        }
        update.bind(pk).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(snapshot)
    }

    /// Applies one UPDATE statement across all matched rows. Same partial
    /// semantics and same pre-update snapshot contract as `update`.
    pub async fn bulk_update(
        &self,
        pks: &[T::Key],
        input: &impl Serialize,
        partial: bool,
    ) -> Result<Vec<T>, DatabaseError> {
        if pks.is_empty() {
            return Ok(Vec::new());
        }

        let columns = input_columns(input, partial)?;
        let sql = update_sql(T::TABLE, T::primary_key_column(), &columns, true);
        let select_sql = Self::select_by_pks_sql();

        let mut tx = self.pool.begin().await?;

        let snapshots = sqlx::query_as::<_, T>(&select_sql)
            .bind(pks)
            .fetch_all(&mut *tx)
            .await?;
        if snapshots.len() != pks.len() {
            return Err(Self::not_found());
        }

        let mut update = sqlx::query(&sql);
        for (_, value) in &columns {
            update = bind_value(update, value);
        }
        update.bind(pks).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(snapshots)
    }

    /// Deletes one record in its own transaction.
    pub async fn delete(&self, pk: &T::Key) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        self.delete_in(&mut tx, pk).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Deletes within a caller-owned transaction, for composing deletes into
    /// a larger unit of work. The caller finalizes the transaction.
    pub async fn delete_in(&self, tx: &mut Transaction<'_, Postgres>, pk: &T::Key) -> Result<(), DatabaseError> {
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = $1",
            T::TABLE,
            T::primary_key_column()
        );

        let result = sqlx::query(&sql).bind(pk).execute(&mut **tx).await?;
        if result.rows_affected() == 0 {
            return Err(Self::not_found());
        }

        Ok(())
    }

    /// Runs a COUNT and a limit/offset data query over the same predicate
    /// set. A fault on either step surfaces as a query error; no partial
    /// pagination data is ever returned.
    pub async fn paginate(
        &self,
        params: &PaginationParams,
        query: SelectQuery,
        order_by: Option<OrderBy>,
    ) -> Result<PaginatedData<T>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;

        let count_sql = query.count_sql();
        let mut count_query = sqlx::query(&count_sql);
        for value in query.params() {
            count_query = bind_value(count_query, value);
        }

        let total: i64 = match count_query.fetch_one(&mut *conn).await {
            Ok(row) => row
                .try_get("count")
                .map_err(|e| DatabaseError::Query(format!("count column missing: {}", e)))?,
            Err(e) => {
                tracing::error!(error = %e, table = T::TABLE, "pagination count query failed");
                return Err(DatabaseError::Query("count query failed".to_string()));
            }
        };

        let pages = total_pages(total, params.size);

        let data_sql = query.data_sql(order_by.as_ref(), params.size, params.offset());
        let mut data_query = sqlx::query_as::<_, T>(&data_sql);
        for value in query.params() {
            data_query = bind_value_as(data_query, value);
        }

        let items = match data_query.fetch_all(&mut *conn).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, table = T::TABLE, "pagination data query failed");
                return Err(DatabaseError::Query("data query failed".to_string()));
            }
        };

        Ok(PaginatedData {
            items,
            page: params.page,
            pages,
            size: params.size,
            total,
        })
    }
}
