//! Rinkside API — axum HTTP surface over the scoring pipeline.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
