//! Rinkside DB — PostgreSQL adapters.
//!
//! Implements the core `RelationalStore` seam over sqlx with explicit
//! per-call timeouts, plus the tenant-guarded repositories for the game
//! aggregate and standings data. All SQL here is routed through the
//! tenant guard; raw pool access stays inside `PgRelationalStore`.

pub mod games;
pub mod pg_store;
pub mod standings;

pub use games::PgGameStore;
pub use pg_store::PgRelationalStore;
pub use standings::PgStandingsStore;
