//! Routes managing live snapshot subscriptions.
//!
//! These endpoints manage `Connection` records only. The duplex transport
//! that drains a connection's channel is a deployment concern; it claims
//! the receiver from the registry out of band.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use uuid::Uuid;

use rinkside_core::tenant::TenantId;
use rinkside_realtime::Connection;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/v1/games/{game_id}/subscriptions
async fn subscribe(
    State(state): State<AppState>,
    Identity(context): Identity,
    Path(game_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Connection>), ApiError> {
    let tenant = TenantId::parse(&context.tenant_id)?;
    // Subscribing to a game outside the tenant's scope is the same 404 as
    // a game that does not exist.
    state.scoring.games.load(tenant, game_id).await?;
    let connection = state.registry.subscribe(tenant, game_id, context.user_id);
    Ok((StatusCode::CREATED, Json(connection)))
}

/// DELETE /api/v1/subscriptions/{connection_id}
async fn unsubscribe(
    State(state): State<AppState>,
    Identity(context): Identity,
    Path(connection_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let tenant = TenantId::parse(&context.tenant_id)?;
    state.registry.disconnect(tenant, connection_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for subscription management.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/games/{game_id}/subscriptions", post(subscribe))
        .route(
            "/api/v1/subscriptions/{connection_id}",
            delete(unsubscribe),
        )
}
