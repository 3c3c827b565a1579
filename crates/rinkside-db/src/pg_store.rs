//! Generic `RelationalStore` implementation over a `PgPool`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo};
use uuid::Uuid;

use rinkside_core::error::CoreError;
use rinkside_core::store::{RelationalStore, RelationalTransaction, SqlParam, SqlRow};

/// PostgreSQL-backed relational store with explicit per-call timeouts.
/// Timeouts surface as retryable `ServiceUnavailable`, never a silent hang.
#[derive(Debug, Clone)]
pub struct PgRelationalStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgRelationalStore {
    /// Creates a store with the given per-call timeout.
    #[must_use]
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> CoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            CoreError::ServiceUnavailable(format!("database unreachable: {err}"))
        }
        other => CoreError::Internal(format!("database error: {other}")),
    }
}

async fn bounded<T, F>(timeout: Duration, what: &str, fut: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, sqlx::Error>> + Send,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(map_sqlx_error),
        Err(_) => Err(CoreError::ServiceUnavailable(format!(
            "database {what} timed out after {timeout:?}"
        ))),
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Uuid(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.clone()),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Timestamp(v) => query.bind(*v),
            SqlParam::Json(v) => query.bind(v.clone()),
            SqlParam::NullableText(v) => query.bind(v.clone()),
        };
    }
    query
}

fn convert_row(row: &PgRow) -> Result<SqlRow, sqlx::Error> {
    let mut out = SqlRow::new();
    for column in row.columns() {
        let i = column.ordinal();
        let value = match column.type_info().name() {
            "UUID" => row
                .try_get::<Option<Uuid>, _>(i)?
                .map(|v| Value::String(v.to_string())),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                row.try_get::<Option<String>, _>(i)?.map(Value::String)
            }
            "INT2" => row
                .try_get::<Option<i16>, _>(i)?
                .map(|v| Value::from(i64::from(v))),
            "INT4" => row
                .try_get::<Option<i32>, _>(i)?
                .map(|v| Value::from(i64::from(v))),
            "INT8" => row.try_get::<Option<i64>, _>(i)?.map(Value::from),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(i)?
                .map(|v| Value::from(f64::from(v))),
            "FLOAT8" => row.try_get::<Option<f64>, _>(i)?.map(Value::from),
            "BOOL" => row.try_get::<Option<bool>, _>(i)?.map(Value::from),
            "TIMESTAMPTZ" => row.try_get::<Option<DateTime<Utc>>, _>(i)?.map(|v| {
                Value::String(v.to_rfc3339_opts(SecondsFormat::Micros, true))
            }),
            "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(i)?,
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: column.name().to_owned(),
                    source: format!("unsupported column type {other}").into(),
                });
            }
        };
        out.push(column.name(), value.unwrap_or(Value::Null));
    }
    Ok(out)
}

#[async_trait]
impl RelationalStore for PgRelationalStore {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, CoreError> {
        let rows = bounded(self.timeout, "query", async {
            bind_params(sqlx::query(sql), params)
                .fetch_all(&self.pool)
                .await
        })
        .await?;
        rows.iter()
            .map(|row| convert_row(row).map_err(map_sqlx_error))
            .collect()
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, CoreError> {
        let result = bounded(self.timeout, "statement", async {
            bind_params(sqlx::query(sql), params)
                .execute(&self.pool)
                .await
        })
        .await?;
        Ok(result.rows_affected())
    }

    async fn begin(&self) -> Result<Box<dyn RelationalTransaction>, CoreError> {
        let tx = bounded(self.timeout, "begin", self.pool.begin()).await?;
        Ok(Box::new(PgTransaction {
            tx,
            timeout: self.timeout,
        }))
    }
}

struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
    timeout: Duration,
}

#[async_trait]
impl RelationalTransaction for PgTransaction {
    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, CoreError> {
        let rows = bounded(self.timeout, "query", async {
            bind_params(sqlx::query(sql), params)
                .fetch_all(&mut *self.tx)
                .await
        })
        .await?;
        rows.iter()
            .map(|row| convert_row(row).map_err(map_sqlx_error))
            .collect()
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, CoreError> {
        let result = bounded(self.timeout, "statement", async {
            bind_params(sqlx::query(sql), params)
                .execute(&mut *self.tx)
                .await
        })
        .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        bounded(self.timeout, "commit", self.tx.commit()).await
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        bounded(self.timeout, "rollback", self.tx.rollback()).await
    }
}
