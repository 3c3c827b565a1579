//! Rinkside API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use rinkside_api::auth::TrustedHeaderIdentity;
use rinkside_api::config::AppConfig;
use rinkside_api::error::AppError;
use rinkside_api::routes;
use rinkside_api::state::AppState;
use rinkside_api::telemetry::{self, OtelMetrics};
use rinkside_core::clock::{Clock, SystemClock};
use rinkside_core::metrics::Metrics;
use rinkside_db::{PgGameStore, PgRelationalStore, PgStandingsStore};
use rinkside_event_store::PgEventLog;
use rinkside_game::application::command_handlers::ScoringDeps;
use rinkside_realtime::{BroadcastDispatcher, ChannelRegistry, SnapshotGenerator};
use rinkside_standings::StandingsEngine;
use rinkside_tenant::TenantGuard;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Rinkside API server");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(sqlx::Error::from)?;

    // Explicitly-owned singletons, constructed once and injected.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let metrics: Arc<dyn Metrics> = Arc::new(OtelMetrics::new());

    let relational = Arc::new(PgRelationalStore::new(pool.clone(), config.db_timeout));
    let guard = TenantGuard::new(relational, Arc::clone(&metrics));

    let games = Arc::new(PgGameStore::new(guard.clone()));
    let standings_store = Arc::new(PgStandingsStore::new(guard));
    let standings = Arc::new(StandingsEngine::new(standings_store, Arc::clone(&metrics)));
    let event_log = Arc::new(PgEventLog::new(pool, config.db_timeout));

    let registry = Arc::new(ChannelRegistry::new(Arc::clone(&clock)));
    let snapshots = Arc::new(SnapshotGenerator::new(
        games.clone(),
        event_log.clone(),
        Arc::clone(&clock),
        Arc::clone(&metrics),
    ));
    let dispatcher = Arc::new(BroadcastDispatcher::new(
        registry.clone(),
        Arc::clone(&metrics),
    ));

    let app_state = AppState {
        identity: Arc::new(TrustedHeaderIdentity),
        scoring: Arc::new(ScoringDeps {
            clock,
            event_log,
            games,
            standings: standings.clone(),
            metrics,
        }),
        snapshots,
        dispatcher,
        registry,
        standings,
    };

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::subscriptions::router())
        .nest("/api/v1/games", routes::games::router())
        .nest("/api/v1/seasons", routes::standings::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
