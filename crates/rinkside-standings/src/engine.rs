//! Full-recompute standings derivation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rinkside_core::error::CoreError;
use rinkside_core::metrics::Metrics;
use rinkside_core::tenant::TenantId;
use uuid::Uuid;

use crate::store::{FinalizedGame, StandingsStore};
use crate::table::{GameResult, TeamStanding};

/// Streak derivation looks at this many most recent results.
const RECENT_RESULTS_WINDOW: usize = 10;

#[derive(Debug, Default)]
struct Accumulator {
    wins: u32,
    losses: u32,
    ties: u32,
    goals_for: u32,
    goals_against: u32,
    /// Most recent first, capped at [`RECENT_RESULTS_WINDOW`].
    recent: Vec<GameResult>,
}

impl Accumulator {
    fn record(&mut self, result: GameResult, scored: u32, conceded: u32) {
        match result {
            GameResult::Win => self.wins += 1,
            GameResult::Loss => self.losses += 1,
            GameResult::Tie => self.ties += 1,
        }
        self.goals_for += scored;
        self.goals_against += conceded;
        self.recent.insert(0, result);
        self.recent.truncate(RECENT_RESULTS_WINDOW);
    }

    fn into_row(self, season_id: Uuid, team_id: Uuid) -> TeamStanding {
        TeamStanding {
            season_id,
            team_id,
            wins: self.wins,
            losses: self.losses,
            ties: self.ties,
            games_played: self.wins + self.losses + self.ties,
            points: self.wins * 3 + self.ties,
            goals_for: self.goals_for,
            goals_against: self.goals_against,
            goal_differential: i64::from(self.goals_for) - i64::from(self.goals_against),
            streak: streak(&self.recent),
        }
    }
}

fn streak(recent: &[GameResult]) -> Option<String> {
    let latest = *recent.first()?;
    let count = recent.iter().take_while(|r| **r == latest).count();
    Some(format!("{}{count}", latest.letter()))
}

/// Derives a season's full league table from its finalized games.
///
/// Pure and idempotent: the same inputs always produce the same rows.
/// Games are replayed in ascending `scheduled_at` order so the bounded
/// recent-results window, and therefore the streak, is correct.
#[must_use]
pub fn compute_standings(
    season_id: Uuid,
    team_ids: &[Uuid],
    games: &[FinalizedGame],
) -> Vec<TeamStanding> {
    let mut accumulators: HashMap<Uuid, Accumulator> = team_ids
        .iter()
        .map(|&team_id| (team_id, Accumulator::default()))
        .collect();

    let mut ordered: Vec<&FinalizedGame> = games.iter().collect();
    ordered.sort_by_key(|g| g.scheduled_at);

    for game in ordered {
        let (home_result, away_result) = if game.home_score > game.away_score {
            (GameResult::Win, GameResult::Loss)
        } else if game.home_score < game.away_score {
            (GameResult::Loss, GameResult::Win)
        } else {
            (GameResult::Tie, GameResult::Tie)
        };

        accumulators
            .entry(game.home_team_id)
            .or_default()
            .record(home_result, game.home_score, game.away_score);
        accumulators
            .entry(game.away_team_id)
            .or_default()
            .record(away_result, game.away_score, game.home_score);
    }

    let mut rows: Vec<TeamStanding> = accumulators
        .into_iter()
        .map(|(team_id, acc)| acc.into_row(season_id, team_id))
        .collect();
    // Deterministic output order: points desc, goal differential desc,
    // then team id for stability.
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.goal_differential.cmp(&a.goal_differential))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    rows
}

/// Orchestrates a full standings recalculation: resolve season to league,
/// load teams and finalized games, compute, and replace the table.
pub struct StandingsEngine {
    store: Arc<dyn StandingsStore>,
    metrics: Arc<dyn Metrics>,
}

impl StandingsEngine {
    /// Creates an engine over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn StandingsStore>, metrics: Arc<dyn Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Recomputes and persists the season's table, returning the new rows.
    /// Safe to retry in full.
    ///
    /// # Errors
    ///
    /// `NotFound` when the season is absent or outside the tenant's scope;
    /// store errors otherwise.
    pub async fn recalculate(
        &self,
        tenant: TenantId,
        season_id: Uuid,
    ) -> Result<Vec<TeamStanding>, CoreError> {
        let started = Instant::now();

        let league_id = self.store.season_league(tenant, season_id).await?;
        let team_ids = self.store.league_team_ids(tenant, league_id).await?;
        let games = self.store.finalized_games(tenant, season_id).await?;

        let rows = compute_standings(season_id, &team_ids, &games);
        self.store
            .replace_standings(tenant, season_id, &rows)
            .await?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_value(
            "standings.recalc_duration_ms",
            elapsed_ms,
            &[("season_id", season_id.to_string())],
        );
        tracing::info!(
            season_id = %season_id,
            games = games.len(),
            teams = team_ids.len(),
            elapsed_ms,
            "standings recalculated"
        );
        Ok(rows)
    }

    /// Reads the persisted table for a season.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn table(
        &self,
        tenant: TenantId,
        season_id: Uuid,
    ) -> Result<Vec<TeamStanding>, CoreError> {
        self.store.season_table(tenant, season_id).await
    }
}
