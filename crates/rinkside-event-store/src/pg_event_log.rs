//! `PostgreSQL` implementation of the `EventLog` trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use rinkside_core::error::{CoreError, codes};
use rinkside_core::event::{
    AppendOutcome, EventLog, EventMetadata, EventRecord, SpatialCoordinates,
};

const EVENT_COLUMNS: &str = "event_id, tenant_id, game_id, event_type, occurred_at, sort_key, \
     payload, user_id, source, ip_address, recorded_at, expires_at, idempotency_key, \
     reversed_by, coordinates";

/// PostgreSQL-backed event log.
///
/// Appends are independent per event; the idempotency check-then-append is
/// a single conditional insert against the per-tenant partial unique
/// index, never a read-then-write.
#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
    timeout: Duration,
}

impl PgEventLog {
    /// Creates a new `PgEventLog` with the given per-call timeout.
    #[must_use]
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(map_sqlx_error),
            Err(_) => Err(CoreError::ServiceUnavailable(format!(
                "event store {what} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

fn map_sqlx_error(err: sqlx::Error) -> CoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            CoreError::ServiceUnavailable(format!("event store unreachable: {err}"))
        }
        other => CoreError::Internal(format!("event store error: {other}")),
    }
}

fn decode_record(row: &PgRow) -> Result<EventRecord, sqlx::Error> {
    let coordinates: Option<serde_json::Value> = row.try_get("coordinates")?;
    let coordinates = coordinates
        .map(serde_json::from_value::<SpatialCoordinates>)
        .transpose()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "coordinates".into(),
            source: Box::new(e),
        })?;

    Ok(EventRecord {
        event_id: row.try_get("event_id")?,
        game_id: row.try_get("game_id")?,
        tenant_id: row.try_get("tenant_id")?,
        event_type: row.try_get("event_type")?,
        occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at")?,
        sort_key: row.try_get("sort_key")?,
        payload: row.try_get("payload")?,
        metadata: EventMetadata {
            user_id: row.try_get("user_id")?,
            source: row.try_get("source")?,
            ip_address: row.try_get("ip_address")?,
        },
        recorded_at: row.try_get("recorded_at")?,
        expires_at: row.try_get("expires_at")?,
        idempotency_key: row.try_get("idempotency_key")?,
        reversed_by: row.try_get("reversed_by")?,
        coordinates,
    })
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn append(&self, record: EventRecord) -> Result<AppendOutcome, CoreError> {
        let coordinates = record
            .coordinates
            .as_ref()
            .map(|c| serde_json::to_value(c).expect("coordinate serialization is infallible"));

        let insert = format!(
            "INSERT INTO game_events ({EVENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (tenant_id, idempotency_key) WHERE idempotency_key IS NOT NULL \
             DO NOTHING \
             RETURNING event_id"
        );
        let inserted = self
            .bounded("append", async {
                sqlx::query(&insert)
                    .bind(record.event_id)
                    .bind(record.tenant_id)
                    .bind(record.game_id)
                    .bind(&record.event_type)
                    .bind(record.occurred_at)
                    .bind(&record.sort_key)
                    .bind(&record.payload)
                    .bind(record.metadata.user_id)
                    .bind(&record.metadata.source)
                    .bind(record.metadata.ip_address.as_deref())
                    .bind(record.recorded_at)
                    .bind(record.expires_at)
                    .bind(record.idempotency_key.as_deref())
                    .bind(record.reversed_by)
                    .bind(coordinates)
                    .fetch_optional(&self.pool)
                    .await
            })
            .await?;

        if inserted.is_some() {
            return Ok(AppendOutcome::Appended(record));
        }

        // The conditional insert was a no-op: an event with this tenant's
        // idempotency key already exists. Return the original.
        let Some(key) = record.idempotency_key.as_deref() else {
            return Err(CoreError::Internal(
                "append without idempotency key was silently dropped".into(),
            ));
        };
        let select = format!(
            "SELECT {EVENT_COLUMNS} FROM game_events \
             WHERE tenant_id = $1 AND idempotency_key = $2"
        );
        let row = self
            .bounded("duplicate lookup", async {
                sqlx::query(&select)
                    .bind(record.tenant_id)
                    .bind(key)
                    .fetch_one(&self.pool)
                    .await
            })
            .await?;
        let original = decode_record(&row).map_err(map_sqlx_error)?;
        tracing::debug!(
            event_id = %original.event_id,
            idempotency_key = key,
            "duplicate append resolved to original event"
        );
        Ok(AppendOutcome::Duplicate(original))
    }

    async fn list_by_game(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
    ) -> Result<Vec<EventRecord>, CoreError> {
        let select = format!(
            "SELECT {EVENT_COLUMNS} FROM game_events \
             WHERE tenant_id = $1 AND game_id = $2 AND expires_at > NOW() \
             ORDER BY occurred_at, event_id"
        );
        let rows = self
            .bounded("list", async {
                sqlx::query(&select)
                    .bind(tenant_id)
                    .bind(game_id)
                    .fetch_all(&self.pool)
                    .await
            })
            .await?;
        rows.iter()
            .map(|row| decode_record(row).map_err(map_sqlx_error))
            .collect()
    }

    async fn find(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<EventRecord>, CoreError> {
        let select = format!(
            "SELECT {EVENT_COLUMNS} FROM game_events \
             WHERE tenant_id = $1 AND game_id = $2 AND event_id = $3 AND expires_at > NOW()"
        );
        let row = self
            .bounded("find", async {
                sqlx::query(&select)
                    .bind(tenant_id)
                    .bind(game_id)
                    .bind(event_id)
                    .fetch_optional(&self.pool)
                    .await
            })
            .await?;
        row.as_ref()
            .map(|r| decode_record(r).map_err(map_sqlx_error))
            .transpose()
    }

    async fn mark_reversed(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
        event_id: Uuid,
        reversal_event_id: Uuid,
    ) -> Result<(), CoreError> {
        let mut tx = self
            .bounded("begin", self.pool.begin())
            .await?;

        let existing = self
            .bounded("reversal lookup", async {
                sqlx::query(
                    "SELECT reversed_by FROM game_events \
                     WHERE tenant_id = $1 AND game_id = $2 AND event_id = $3 \
                     FOR UPDATE",
                )
                .bind(tenant_id)
                .bind(game_id)
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await
            })
            .await?;

        let Some(row) = existing else {
            return Err(CoreError::NotFound {
                resource: "event",
                id: event_id,
            });
        };
        let reversed_by: Option<Uuid> = row.try_get("reversed_by").map_err(map_sqlx_error)?;
        match reversed_by {
            Some(existing_id) if existing_id == reversal_event_id => {
                // Idempotent re-mark with the same reversal.
                self.bounded("rollback", tx.rollback()).await?;
                Ok(())
            }
            Some(existing_id) => Err(CoreError::conflict(
                codes::EVENT_ALREADY_REVERSED,
                format!("event {event_id} already reversed by {existing_id}"),
            )),
            None => {
                self.bounded("reversal mark", async {
                    sqlx::query(
                        "UPDATE game_events SET reversed_by = $4 \
                         WHERE tenant_id = $1 AND game_id = $2 AND event_id = $3",
                    )
                    .bind(tenant_id)
                    .bind(game_id)
                    .bind(event_id)
                    .bind(reversal_event_id)
                    .execute(&mut *tx)
                    .await
                })
                .await?;
                self.bounded("commit", tx.commit()).await?;
                Ok(())
            }
        }
    }
}
