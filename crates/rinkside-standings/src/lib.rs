//! Rinkside Standings — derivation of league tables from finalized games.
//!
//! Standings are never incrementally patched: every recalculation replays
//! the season's finalized games in chronological order and replaces the
//! table wholesale, so re-running from the same game set always yields the
//! same rows.

pub mod engine;
pub mod store;
pub mod table;

pub use engine::{StandingsEngine, compute_standings};
pub use store::{FinalizedGame, StandingsStore};
pub use table::{GameResult, TeamStanding};
