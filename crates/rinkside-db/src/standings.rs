//! Tenant-guarded repository for standings data.

use async_trait::async_trait;
use uuid::Uuid;

use rinkside_core::error::CoreError;
use rinkside_core::store::{SqlParam, SqlRow};
use rinkside_core::tenant::TenantId;
use rinkside_standings::{FinalizedGame, StandingsStore, TeamStanding};
use rinkside_tenant::TenantGuard;

const SELECT_SEASON_LEAGUE: &str = "SELECT s.league_id, l.tenant_id \
     FROM seasons s \
     JOIN leagues l ON l.id = s.league_id \
     WHERE l.tenant_id = $1 AND s.id = $2";

const SELECT_LEAGUE_TEAMS: &str = "SELECT t.id \
     FROM teams t \
     JOIN leagues l ON l.id = t.league_id \
     WHERE l.tenant_id = $1 AND t.league_id = $2";

const SELECT_FINALIZED_GAMES: &str = "SELECT g.id, g.home_team_id, g.away_team_id, \
     g.home_score, g.away_score, g.scheduled_at \
     FROM games g \
     JOIN seasons s ON s.id = g.season_id \
     JOIN leagues l ON l.id = s.league_id \
     WHERE l.tenant_id = $1 AND g.season_id = $2 AND g.status = 'FINAL'";

/// Wholesale upsert: the insert is fenced on the season belonging to the
/// tenant, and a conflict on `(season_id, team_id)` replaces every value.
const UPSERT_STANDING: &str = "INSERT INTO team_standings \
     (season_id, team_id, wins, losses, ties, games_played, points, \
      goals_for, goals_against, goal_differential, streak, updated_at) \
     SELECT $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW() \
     WHERE EXISTS (SELECT 1 FROM seasons s \
                   JOIN leagues l ON l.id = s.league_id \
                   WHERE l.tenant_id = $1 AND s.id = $2) \
     ON CONFLICT (season_id, team_id) DO UPDATE SET \
       wins = EXCLUDED.wins, \
       losses = EXCLUDED.losses, \
       ties = EXCLUDED.ties, \
       games_played = EXCLUDED.games_played, \
       points = EXCLUDED.points, \
       goals_for = EXCLUDED.goals_for, \
       goals_against = EXCLUDED.goals_against, \
       goal_differential = EXCLUDED.goal_differential, \
       streak = EXCLUDED.streak, \
       updated_at = EXCLUDED.updated_at";

const SELECT_SEASON_TABLE: &str = "SELECT ts.season_id, ts.team_id, ts.wins, ts.losses, \
     ts.ties, ts.games_played, ts.points, ts.goals_for, ts.goals_against, \
     ts.goal_differential, ts.streak, l.tenant_id \
     FROM team_standings ts \
     JOIN seasons s ON s.id = ts.season_id \
     JOIN leagues l ON l.id = s.league_id \
     WHERE l.tenant_id = $1 AND ts.season_id = $2 \
     ORDER BY ts.points DESC, ts.goal_differential DESC, ts.team_id";

fn count(row: &SqlRow, name: &str) -> Result<u32, CoreError> {
    u32::try_from(row.int(name)?)
        .map_err(|_| CoreError::Internal(format!("negative count in column {name}")))
}

fn standing_from_row(row: &SqlRow) -> Result<TeamStanding, CoreError> {
    Ok(TeamStanding {
        season_id: row.uuid("season_id")?,
        team_id: row.uuid("team_id")?,
        wins: count(row, "wins")?,
        losses: count(row, "losses")?,
        ties: count(row, "ties")?,
        games_played: count(row, "games_played")?,
        points: count(row, "points")?,
        goals_for: count(row, "goals_for")?,
        goals_against: count(row, "goals_against")?,
        goal_differential: row.int("goal_differential")?,
        streak: row.opt_text("streak")?,
    })
}

fn finalized_game_from_row(row: &SqlRow) -> Result<FinalizedGame, CoreError> {
    Ok(FinalizedGame {
        game_id: row.uuid("id")?,
        home_team_id: row.uuid("home_team_id")?,
        away_team_id: row.uuid("away_team_id")?,
        home_score: count(row, "home_score")?,
        away_score: count(row, "away_score")?,
        scheduled_at: row.timestamp("scheduled_at")?,
    })
}

/// PostgreSQL-backed `StandingsStore` routed through the tenant guard.
#[derive(Clone)]
pub struct PgStandingsStore {
    guard: TenantGuard,
}

impl PgStandingsStore {
    /// Creates a store over the given guard.
    #[must_use]
    pub fn new(guard: TenantGuard) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl StandingsStore for PgStandingsStore {
    async fn season_league(&self, tenant: TenantId, season_id: Uuid) -> Result<Uuid, CoreError> {
        let rows = self
            .guard
            .query(
                &tenant.to_string(),
                SELECT_SEASON_LEAGUE,
                &[SqlParam::Uuid(season_id)],
            )
            .await?;
        let Some(row) = rows.first() else {
            return Err(CoreError::NotFound {
                resource: "season",
                id: season_id,
            });
        };
        row.uuid("league_id")
    }

    async fn league_team_ids(
        &self,
        tenant: TenantId,
        league_id: Uuid,
    ) -> Result<Vec<Uuid>, CoreError> {
        let rows = self
            .guard
            .query(
                &tenant.to_string(),
                SELECT_LEAGUE_TEAMS,
                &[SqlParam::Uuid(league_id)],
            )
            .await?;
        rows.iter().map(|row| row.uuid("id")).collect()
    }

    async fn finalized_games(
        &self,
        tenant: TenantId,
        season_id: Uuid,
    ) -> Result<Vec<FinalizedGame>, CoreError> {
        let rows = self
            .guard
            .query(
                &tenant.to_string(),
                SELECT_FINALIZED_GAMES,
                &[SqlParam::Uuid(season_id)],
            )
            .await?;
        rows.iter().map(finalized_game_from_row).collect()
    }

    async fn replace_standings(
        &self,
        tenant: TenantId,
        season_id: Uuid,
        rows: &[TeamStanding],
    ) -> Result<(), CoreError> {
        let mut tx = self.guard.begin(&tenant.to_string()).await?;
        for row in rows {
            tx.execute(
                UPSERT_STANDING,
                &[
                    SqlParam::Uuid(season_id),
                    SqlParam::Uuid(row.team_id),
                    SqlParam::Int(i64::from(row.wins)),
                    SqlParam::Int(i64::from(row.losses)),
                    SqlParam::Int(i64::from(row.ties)),
                    SqlParam::Int(i64::from(row.games_played)),
                    SqlParam::Int(i64::from(row.points)),
                    SqlParam::Int(i64::from(row.goals_for)),
                    SqlParam::Int(i64::from(row.goals_against)),
                    SqlParam::Int(row.goal_differential),
                    SqlParam::NullableText(row.streak.clone()),
                ],
            )
            .await?;
        }
        tx.commit().await
    }

    async fn season_table(
        &self,
        tenant: TenantId,
        season_id: Uuid,
    ) -> Result<Vec<TeamStanding>, CoreError> {
        // Resolve the season first so an absent season and a foreign
        // tenant's season both read as the same not-found.
        self.season_league(tenant, season_id).await?;
        let rows = self
            .guard
            .query(
                &tenant.to_string(),
                SELECT_SEASON_TABLE,
                &[SqlParam::Uuid(season_id)],
            )
            .await?;
        rows.iter().map(standing_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_every_standings_query_carries_a_tenant_condition() {
        for sql in [
            SELECT_SEASON_LEAGUE,
            SELECT_LEAGUE_TEAMS,
            SELECT_FINALIZED_GAMES,
            UPSERT_STANDING,
            SELECT_SEASON_TABLE,
        ] {
            assert!(sql.to_lowercase().contains("tenant_id"), "unscoped: {sql}");
        }
    }

    #[test]
    fn test_standing_decodes_including_null_streak() {
        let mut row = SqlRow::new();
        row.push("season_id", json!(Uuid::new_v4().to_string()));
        row.push("team_id", json!(Uuid::new_v4().to_string()));
        row.push("wins", json!(4));
        row.push("losses", json!(2));
        row.push("ties", json!(1));
        row.push("games_played", json!(7));
        row.push("points", json!(13));
        row.push("goals_for", json!(20));
        row.push("goals_against", json!(11));
        row.push("goal_differential", json!(9));
        row.push("streak", serde_json::Value::Null);

        let standing = standing_from_row(&row).unwrap();

        assert_eq!(standing.points, 13);
        assert_eq!(standing.streak, None);
    }
}
