//! Shared application state.
//!
//! Every dependency is an explicitly-owned, injected singleton built in
//! `main` (or a test harness) — no ambient module state, and a fresh state
//! per test is a complete teardown.

use std::sync::Arc;

use rinkside_core::auth::IdentityProvider;
use rinkside_game::application::command_handlers::ScoringDeps;
use rinkside_realtime::{BroadcastDispatcher, ChannelRegistry, SnapshotGenerator};
use rinkside_standings::StandingsEngine;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Identity collaborator for the auth extractor.
    pub identity: Arc<dyn IdentityProvider>,
    /// Write-path dependencies.
    pub scoring: Arc<ScoringDeps>,
    /// Snapshot composition.
    pub snapshots: Arc<SnapshotGenerator>,
    /// Snapshot fan-out.
    pub dispatcher: Arc<BroadcastDispatcher>,
    /// Live subscription registry.
    pub registry: Arc<ChannelRegistry>,
    /// Standings reads and recalculation.
    pub standings: Arc<StandingsEngine>,
}
