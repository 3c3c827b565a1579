//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use rinkside_api::auth::TrustedHeaderIdentity;
use rinkside_api::routes;
use rinkside_api::state::AppState;
use rinkside_core::clock::Clock;
use rinkside_core::error::CoreError;
use rinkside_core::metrics::NoopMetrics;
use rinkside_core::tenant::TenantId;
use rinkside_game::application::command_handlers::ScoringDeps;
use rinkside_game::domain::aggregates::{Game, GameStatus};
use rinkside_game::store::{GameStore, GameUpdateTx};
use rinkside_realtime::{BroadcastDispatcher, ChannelRegistry, SnapshotGenerator};
use rinkside_standings::{FinalizedGame, StandingsEngine, StandingsStore, TeamStanding};
use rinkside_test_support::{FixedClock, InMemoryEventLog};

pub const TENANT: &str = "4f9a2b6c-1d3e-4f50-8a7b-9c0d1e2f3a4b";
pub const OTHER_TENANT: &str = "b1c2d3e4-f5a6-4b7c-8d9e-0f1a2b3c4d5e";
pub const USER: &str = "7a8b9c0d-1e2f-4a3b-8c4d-5e6f7a8b9c0d";

/// Fixed server time used across all integration tests.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 7, 19, 0, 0).unwrap()
}

/// Identifiers of the seeded league hierarchy.
#[derive(Debug, Clone)]
pub struct SeededLeague {
    pub league_id: Uuid,
    pub season_id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub game_id: Uuid,
}

/// A fake relational world: one tenant, one league, one season, two
/// teams, and a games map shared between the game store and the standings
/// store, so finalized games feed recalculation the way the joined tables
/// do in PostgreSQL.
pub struct InMemoryLeague {
    tenant_id: Uuid,
    seed: SeededLeague,
    games: Arc<Mutex<HashMap<Uuid, Game>>>,
    standings: Mutex<Vec<TeamStanding>>,
}

impl InMemoryLeague {
    pub fn new() -> Arc<Self> {
        let seed = SeededLeague {
            league_id: Uuid::new_v4(),
            season_id: Uuid::new_v4(),
            home_team_id: Uuid::new_v4(),
            away_team_id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
        };
        let game = Game {
            id: seed.game_id,
            season_id: seed.season_id,
            home_team_id: seed.home_team_id,
            away_team_id: seed.away_team_id,
            scheduled_at: fixed_now() - chrono::Duration::minutes(30),
            status: GameStatus::Live,
            home_score: 0,
            away_score: 0,
            created_at: fixed_now() - chrono::Duration::days(1),
            updated_at: fixed_now() - chrono::Duration::minutes(30),
        };
        let mut games = HashMap::new();
        games.insert(game.id, game);
        Arc::new(Self {
            tenant_id: Uuid::parse_str(TENANT).unwrap(),
            seed,
            games: Arc::new(Mutex::new(games)),
            standings: Mutex::new(Vec::new()),
        })
    }

    pub fn seed(&self) -> SeededLeague {
        self.seed.clone()
    }

    pub fn game(&self, game_id: Uuid) -> Game {
        self.games.lock().unwrap().get(&game_id).unwrap().clone()
    }

    fn check_tenant(
        &self,
        tenant: TenantId,
        id: Uuid,
        resource: &'static str,
    ) -> Result<(), CoreError> {
        if tenant.as_uuid() == self.tenant_id {
            Ok(())
        } else {
            Err(CoreError::NotFound { resource, id })
        }
    }
}

#[async_trait]
impl GameStore for InMemoryLeague {
    async fn load(&self, tenant: TenantId, game_id: Uuid) -> Result<Game, CoreError> {
        self.check_tenant(tenant, game_id, "game")?;
        self.games
            .lock()
            .unwrap()
            .get(&game_id)
            .cloned()
            .ok_or(CoreError::NotFound {
                resource: "game",
                id: game_id,
            })
    }

    async fn begin_update(
        &self,
        tenant: TenantId,
        game_id: Uuid,
    ) -> Result<Box<dyn GameUpdateTx>, CoreError> {
        let game = self.load(tenant, game_id).await?;
        Ok(Box::new(InMemoryGameTx {
            games: Arc::clone(&self.games),
            game,
        }))
    }
}

struct InMemoryGameTx {
    games: Arc<Mutex<HashMap<Uuid, Game>>>,
    game: Game,
}

#[async_trait]
impl GameUpdateTx for InMemoryGameTx {
    fn game(&self) -> &Game {
        &self.game
    }

    async fn commit(self: Box<Self>, updated: Game) -> Result<(), CoreError> {
        self.games.lock().unwrap().insert(updated.id, updated);
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), CoreError> {
        Ok(())
    }
}

#[async_trait]
impl StandingsStore for InMemoryLeague {
    async fn season_league(&self, tenant: TenantId, season_id: Uuid) -> Result<Uuid, CoreError> {
        self.check_tenant(tenant, season_id, "season")?;
        if season_id == self.seed.season_id {
            Ok(self.seed.league_id)
        } else {
            Err(CoreError::NotFound {
                resource: "season",
                id: season_id,
            })
        }
    }

    async fn league_team_ids(
        &self,
        tenant: TenantId,
        league_id: Uuid,
    ) -> Result<Vec<Uuid>, CoreError> {
        self.check_tenant(tenant, league_id, "league")?;
        Ok(vec![self.seed.home_team_id, self.seed.away_team_id])
    }

    async fn finalized_games(
        &self,
        tenant: TenantId,
        season_id: Uuid,
    ) -> Result<Vec<FinalizedGame>, CoreError> {
        self.check_tenant(tenant, season_id, "season")?;
        Ok(self
            .games
            .lock()
            .unwrap()
            .values()
            .filter(|g| g.season_id == season_id && g.status == GameStatus::Final)
            .map(|g| FinalizedGame {
                game_id: g.id,
                home_team_id: g.home_team_id,
                away_team_id: g.away_team_id,
                home_score: g.home_score,
                away_score: g.away_score,
                scheduled_at: g.scheduled_at,
            })
            .collect())
    }

    async fn replace_standings(
        &self,
        tenant: TenantId,
        season_id: Uuid,
        rows: &[TeamStanding],
    ) -> Result<(), CoreError> {
        self.check_tenant(tenant, season_id, "season")?;
        let mut standings = self.standings.lock().unwrap();
        standings.retain(|row| row.season_id != season_id);
        standings.extend_from_slice(rows);
        Ok(())
    }

    async fn season_table(
        &self,
        tenant: TenantId,
        season_id: Uuid,
    ) -> Result<Vec<TeamStanding>, CoreError> {
        self.check_tenant(tenant, season_id, "season")?;
        Ok(self
            .standings
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.season_id == season_id)
            .cloned()
            .collect())
    }
}

/// A fully wired app over in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub league: Arc<InMemoryLeague>,
    pub event_log: Arc<InMemoryEventLog>,
    pub registry: Arc<ChannelRegistry>,
}

/// Builds the full app router with deterministic clock and in-memory
/// stores. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> TestApp {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(fixed_now()));
    let metrics = Arc::new(NoopMetrics);
    let league = InMemoryLeague::new();
    let event_log = Arc::new(InMemoryEventLog::new());
    let registry = Arc::new(ChannelRegistry::new(Arc::clone(&clock)));

    let standings = Arc::new(StandingsEngine::new(league.clone(), metrics.clone()));
    let snapshots = Arc::new(SnapshotGenerator::new(
        league.clone(),
        event_log.clone(),
        Arc::clone(&clock),
        metrics.clone(),
    ));
    let dispatcher = Arc::new(BroadcastDispatcher::new(registry.clone(), metrics.clone()));

    let app_state = AppState {
        identity: Arc::new(TrustedHeaderIdentity),
        scoring: Arc::new(ScoringDeps {
            clock,
            event_log: event_log.clone(),
            games: league.clone(),
            standings: standings.clone(),
            metrics,
        }),
        snapshots,
        dispatcher,
        registry: registry.clone(),
        standings,
    };

    let router = Router::new()
        .merge(routes::health::router())
        .merge(routes::subscriptions::router())
        .nest("/api/v1/games", routes::games::router())
        .nest("/api/v1/seasons", routes::standings::router())
        .with_state(app_state);

    TestApp {
        router,
        league,
        event_log,
        registry,
    }
}

fn identified(builder: axum::http::request::Builder, tenant: &str) -> axum::http::request::Builder {
    builder
        .header("x-user-id", USER)
        .header("x-tenant-id", tenant)
        .header("x-roles", "scorekeeper")
}

/// Send an authenticated POST with a JSON body and return the response.
pub async fn post_json(
    app: &TestApp,
    tenant: &str,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = identified(Request::builder().method("POST").uri(uri), tenant)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send an authenticated GET and return the response.
pub async fn get_json(app: &TestApp, tenant: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = identified(Request::builder().method("GET").uri(uri), tenant)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send an arbitrary request and parse the JSON response body.
pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };
    (status, json)
}
