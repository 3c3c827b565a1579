//! Tenant-guarded repository for the Game aggregate.

use async_trait::async_trait;
use uuid::Uuid;

use rinkside_core::error::CoreError;
use rinkside_core::store::{SqlParam, SqlRow};
use rinkside_core::tenant::TenantId;
use rinkside_game::domain::aggregates::{Game, GameStatus};
use rinkside_game::store::{GameStore, GameUpdateTx};
use rinkside_tenant::{GuardedTransaction, TenantGuard};

/// Tenant scope is reachable only transitively through `season → league`,
/// so every game read joins up to `leagues` and selects `l.tenant_id` for
/// the guard's row check.
const SELECT_GAME: &str = "SELECT g.id, g.season_id, g.home_team_id, g.away_team_id, \
     g.scheduled_at, g.status, g.home_score, g.away_score, g.created_at, g.updated_at, \
     l.tenant_id \
     FROM games g \
     JOIN seasons s ON s.id = g.season_id \
     JOIN leagues l ON l.id = s.league_id \
     WHERE l.tenant_id = $1 AND g.id = $2";

/// Same row, locked for the duration of the projection transaction so two
/// concurrent applies serialize instead of racing.
const SELECT_GAME_FOR_UPDATE: &str = "SELECT g.id, g.season_id, g.home_team_id, g.away_team_id, \
     g.scheduled_at, g.status, g.home_score, g.away_score, g.created_at, g.updated_at, \
     l.tenant_id \
     FROM games g \
     JOIN seasons s ON s.id = g.season_id \
     JOIN leagues l ON l.id = s.league_id \
     WHERE l.tenant_id = $1 AND g.id = $2 \
     FOR UPDATE OF g";

const UPDATE_GAME: &str = "UPDATE games g \
     SET status = $3, home_score = $4, away_score = $5, updated_at = $6 \
     FROM seasons s \
     JOIN leagues l ON l.id = s.league_id \
     WHERE s.id = g.season_id AND l.tenant_id = $1 AND g.id = $2";

pub(crate) fn game_from_row(row: &SqlRow) -> Result<Game, CoreError> {
    let score = |name: &str| -> Result<u32, CoreError> {
        u32::try_from(row.int(name)?)
            .map_err(|_| CoreError::Internal(format!("negative score in column {name}")))
    };
    Ok(Game {
        id: row.uuid("id")?,
        season_id: row.uuid("season_id")?,
        home_team_id: row.uuid("home_team_id")?,
        away_team_id: row.uuid("away_team_id")?,
        scheduled_at: row.timestamp("scheduled_at")?,
        status: GameStatus::parse(&row.text("status")?)?,
        home_score: score("home_score")?,
        away_score: score("away_score")?,
        created_at: row.timestamp("created_at")?,
        updated_at: row.timestamp("updated_at")?,
    })
}

/// PostgreSQL-backed `GameStore` routed through the tenant guard.
#[derive(Clone)]
pub struct PgGameStore {
    guard: TenantGuard,
}

impl PgGameStore {
    /// Creates a store over the given guard.
    #[must_use]
    pub fn new(guard: TenantGuard) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn load(&self, tenant: TenantId, game_id: Uuid) -> Result<Game, CoreError> {
        let rows = self
            .guard
            .query(
                &tenant.to_string(),
                SELECT_GAME,
                &[SqlParam::Uuid(game_id)],
            )
            .await?;
        let Some(row) = rows.first() else {
            return Err(CoreError::NotFound {
                resource: "game",
                id: game_id,
            });
        };
        game_from_row(row)
    }

    async fn begin_update(
        &self,
        tenant: TenantId,
        game_id: Uuid,
    ) -> Result<Box<dyn GameUpdateTx>, CoreError> {
        let mut tx = self.guard.begin(&tenant.to_string()).await?;
        let rows = tx
            .query(SELECT_GAME_FOR_UPDATE, &[SqlParam::Uuid(game_id)])
            .await?;
        let Some(row) = rows.first() else {
            tx.rollback().await?;
            return Err(CoreError::NotFound {
                resource: "game",
                id: game_id,
            });
        };
        let game = game_from_row(row)?;
        Ok(Box::new(PgGameUpdateTx { tx, game }))
    }
}

struct PgGameUpdateTx {
    tx: GuardedTransaction,
    game: Game,
}

#[async_trait]
impl GameUpdateTx for PgGameUpdateTx {
    fn game(&self) -> &Game {
        &self.game
    }

    async fn commit(mut self: Box<Self>, updated: Game) -> Result<(), CoreError> {
        let affected = self
            .tx
            .execute(
                UPDATE_GAME,
                &[
                    SqlParam::Uuid(updated.id),
                    SqlParam::Text(updated.status.as_str().to_owned()),
                    SqlParam::Int(i64::from(updated.home_score)),
                    SqlParam::Int(i64::from(updated.away_score)),
                    SqlParam::Timestamp(updated.updated_at),
                ],
            )
            .await?;
        if affected == 0 {
            self.tx.rollback().await?;
            return Err(CoreError::Internal(format!(
                "locked game {} vanished before update",
                updated.id
            )));
        }
        self.tx.commit().await
    }

    async fn abort(self: Box<Self>) -> Result<(), CoreError> {
        self.tx.rollback().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_every_game_query_carries_a_tenant_condition() {
        for sql in [SELECT_GAME, SELECT_GAME_FOR_UPDATE, UPDATE_GAME] {
            assert!(sql.to_lowercase().contains("tenant_id"), "unscoped: {sql}");
        }
    }

    #[test]
    fn test_game_decodes_from_a_result_row() {
        let mut row = SqlRow::new();
        let id = Uuid::new_v4();
        row.push("id", json!(id.to_string()));
        row.push("season_id", json!(Uuid::new_v4().to_string()));
        row.push("home_team_id", json!(Uuid::new_v4().to_string()));
        row.push("away_team_id", json!(Uuid::new_v4().to_string()));
        row.push("scheduled_at", json!("2026-03-07T19:00:00Z"));
        row.push("status", json!("LIVE"));
        row.push("home_score", json!(2));
        row.push("away_score", json!(1));
        row.push("created_at", json!("2026-03-01T12:00:00Z"));
        row.push("updated_at", json!("2026-03-07T19:05:00Z"));

        let game = game_from_row(&row).unwrap();

        assert_eq!(game.id, id);
        assert_eq!(game.status, GameStatus::Live);
        assert_eq!((game.home_score, game.away_score), (2, 1));
    }

    #[test]
    fn test_unknown_status_is_an_internal_error() {
        let mut row = SqlRow::new();
        row.push("id", json!(Uuid::new_v4().to_string()));
        row.push("season_id", json!(Uuid::new_v4().to_string()));
        row.push("home_team_id", json!(Uuid::new_v4().to_string()));
        row.push("away_team_id", json!(Uuid::new_v4().to_string()));
        row.push("scheduled_at", json!("2026-03-07T19:00:00Z"));
        row.push("status", json!("HALFTIME"));
        row.push("home_score", json!(0));
        row.push("away_score", json!(0));
        row.push("created_at", json!("2026-03-01T12:00:00Z"));
        row.push("updated_at", json!("2026-03-01T12:00:00Z"));

        let err = game_from_row(&row).unwrap_err();

        assert!(matches!(err, CoreError::Internal(_)));
    }
}
