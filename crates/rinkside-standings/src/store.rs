//! Storage seam for standings derivation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rinkside_core::error::CoreError;
use rinkside_core::tenant::TenantId;
use uuid::Uuid;

use crate::table::TeamStanding;

/// A finalized game as consumed by the derivation engine.
#[derive(Debug, Clone)]
pub struct FinalizedGame {
    /// Game identifier.
    pub game_id: Uuid,
    /// Home side.
    pub home_team_id: Uuid,
    /// Away side.
    pub away_team_id: Uuid,
    /// Authoritative final home score.
    pub home_score: u32,
    /// Authoritative final away score.
    pub away_score: u32,
    /// Scheduled start; replay order for streak computation.
    pub scheduled_at: DateTime<Utc>,
}

/// Tenant-scoped reads and the wholesale table upsert backing the engine.
#[async_trait]
pub trait StandingsStore: Send + Sync {
    /// Resolves a season to its league.
    async fn season_league(&self, tenant: TenantId, season_id: Uuid) -> Result<Uuid, CoreError>;

    /// All team ids in a league.
    async fn league_team_ids(
        &self,
        tenant: TenantId,
        league_id: Uuid,
    ) -> Result<Vec<Uuid>, CoreError>;

    /// All games in a season with final status.
    async fn finalized_games(
        &self,
        tenant: TenantId,
        season_id: Uuid,
    ) -> Result<Vec<FinalizedGame>, CoreError>;

    /// Replaces the season's standings rows in one transaction, keyed on
    /// `(season_id, team_id)`; prior values are overwritten in full.
    async fn replace_standings(
        &self,
        tenant: TenantId,
        season_id: Uuid,
        rows: &[TeamStanding],
    ) -> Result<(), CoreError>;

    /// Reads the current persisted table for a season.
    async fn season_table(
        &self,
        tenant: TenantId,
        season_id: Uuid,
    ) -> Result<Vec<TeamStanding>, CoreError>;
}
