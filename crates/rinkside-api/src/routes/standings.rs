//! Routes for season standings.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use rinkside_core::tenant::TenantId;
use rinkside_standings::TeamStanding;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/v1/seasons/{season_id}/standings
async fn season_standings(
    State(state): State<AppState>,
    Identity(context): Identity,
    Path(season_id): Path<Uuid>,
) -> Result<Json<Vec<TeamStanding>>, ApiError> {
    let tenant = TenantId::parse(&context.tenant_id)?;
    let table = state.standings.table(tenant, season_id).await?;
    Ok(Json(table))
}

/// Returns the router for the standings context.
pub fn router() -> Router<AppState> {
    Router::new().route("/{season_id}/standings", get(season_standings))
}
