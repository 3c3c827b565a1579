//! Routes for the scoring context: record events, read snapshots.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rinkside_core::event::{EventRecord, SpatialCoordinates};
use rinkside_core::tenant::TenantId;
use rinkside_game::application::command_handlers::handle_record_game_action;
use rinkside_game::domain::commands::RecordGameAction;
use rinkside_realtime::GameSnapshot;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /api/v1/games/{game_id}/events`.
#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    /// Event type in wire form.
    pub event_type: String,
    /// Type-tagged payload.
    pub payload: serde_json::Value,
    /// Client-captured occurrence time, for offline entry.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Retry token; resubmissions with the same key are safe.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Optional playing-surface coordinates.
    #[serde(default)]
    pub coordinates: Option<SpatialCoordinates>,
}

/// A stored event trimmed for responses.
#[derive(Debug, Serialize)]
pub struct EventView {
    /// Event identifier.
    pub event_id: Uuid,
    /// Event type in wire form.
    pub event_type: String,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Type-tagged payload.
    pub payload: serde_json::Value,
    /// Set when the event has been reversed.
    pub reversed_by: Option<Uuid>,
    /// The retry token the event was stored under, when any.
    pub idempotency_key: Option<String>,
}

impl From<&EventRecord> for EventView {
    fn from(record: &EventRecord) -> Self {
        Self {
            event_id: record.event_id,
            event_type: record.event_type.clone(),
            occurred_at: record.occurred_at,
            payload: record.payload.clone(),
            reversed_by: record.reversed_by,
            idempotency_key: record.idempotency_key.clone(),
        }
    }
}

/// Response of `POST /api/v1/games/{game_id}/events`.
#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    /// The stored event (the original one for duplicates).
    pub event: EventView,
    /// Fresh snapshot after the write.
    pub snapshot: GameSnapshot,
    /// Whether the idempotency key matched a prior submission.
    pub duplicate: bool,
}

/// POST /api/v1/games/{game_id}/events
async fn record_event(
    State(state): State<AppState>,
    Identity(context): Identity,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<RecordEventRequest>,
) -> Result<(StatusCode, Json<RecordEventResponse>), ApiError> {
    let command = RecordGameAction {
        tenant_id: context.tenant_id.clone(),
        game_id,
        event_type: body.event_type,
        payload: body.payload,
        occurred_at: body.occurred_at,
        idempotency_key: body.idempotency_key,
        coordinates: body.coordinates,
        user_id: context.user_id,
        source: headers
            .get("x-source")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http")
            .to_owned(),
        ip_address: headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or(v).trim().to_owned()),
    };

    let outcome = handle_record_game_action(&command, &state.scoring).await?;
    let tenant = TenantId::parse(&context.tenant_id)?;
    let snapshot = state
        .snapshots
        .generate_for_game(tenant, &outcome.game)
        .await?;

    // Fan-out is best-effort and must never fail the write.
    if !outcome.duplicate {
        let message_type = if outcome.finalized {
            "game_finalized"
        } else {
            "score_update"
        };
        state
            .dispatcher
            .broadcast(tenant, game_id, &snapshot, message_type)
            .await;
    }

    let status = if outcome.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(RecordEventResponse {
            event: EventView::from(&outcome.event),
            snapshot,
            duplicate: outcome.duplicate,
        }),
    ))
}

/// GET /api/v1/games/{game_id}/snapshot
async fn game_snapshot(
    State(state): State<AppState>,
    Identity(context): Identity,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameSnapshot>, ApiError> {
    let tenant = TenantId::parse(&context.tenant_id)?;
    let snapshot = state.snapshots.generate(tenant, game_id).await?;
    Ok(Json(snapshot))
}

/// Returns the router for the scoring context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{game_id}/events", post(record_event))
        .route("/{game_id}/snapshot", get(game_snapshot))
}
