//! Rinkside Event Store — durable, append-only log of game events.
//!
//! PostgreSQL implementation of the core `EventLog` trait: conditional
//! insert for per-tenant idempotency, `(occurred_at, event_id)` total
//! ordering, TTL-based expiry, and the `reversed_by` back-reference as the
//! single permitted mutation.

pub mod pg_event_log;
pub mod schema;

pub use pg_event_log::PgEventLog;
