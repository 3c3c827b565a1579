//! Event log abstraction.
//!
//! Scoring actions are stored as immutable, append-only records. The only
//! permitted mutation is the `reversed_by` back-reference; everything else
//! is reconstructable by replay.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Events expire this many days after server receipt.
pub const EVENT_TTL_DAYS: i64 = 90;

/// Who recorded an event and from where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// The user who submitted the action.
    pub user_id: Uuid,
    /// Submitting client, e.g. `"scorekeeper-app"`.
    pub source: String,
    /// Client IP, when known.
    pub ip_address: Option<String>,
}

/// Normalized playing-surface coordinates attached to an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialCoordinates {
    /// Horizontal position in `[0.0, 1.0]`.
    pub x: f64,
    /// Vertical position in `[0.0, 1.0]`.
    pub y: f64,
    /// Named zone, when the client supplies one.
    pub zone: Option<String>,
}

/// A stored scoring event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// The game this event belongs to.
    pub game_id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Event type discriminant in its wire form, e.g. `"GOAL_SCORED"`.
    pub event_type: String,
    /// Client- or server-supplied occurrence time.
    pub occurred_at: DateTime<Utc>,
    /// Chronological sort key; see [`sort_key`].
    pub sort_key: String,
    /// Type-tagged payload.
    pub payload: serde_json::Value,
    /// Submission metadata.
    pub metadata: EventMetadata,
    /// Server receipt time.
    pub recorded_at: DateTime<Utc>,
    /// TTL expiry, [`EVENT_TTL_DAYS`] after receipt.
    pub expires_at: DateTime<Utc>,
    /// Caller-supplied retry token, unique per tenant.
    pub idempotency_key: Option<String>,
    /// Set when a later reversal event references this one.
    pub reversed_by: Option<Uuid>,
    /// Optional playing-surface coordinates.
    pub coordinates: Option<SpatialCoordinates>,
}

/// Derives the stable chronological sort key for an event.
///
/// RFC 3339 UTC at millisecond precision sorts lexicographically in
/// timestamp order; the event id suffix breaks ties between events with
/// identical timestamps deterministically.
#[must_use]
pub fn sort_key(occurred_at: DateTime<Utc>, event_id: Uuid) -> String {
    format!(
        "{}#{}",
        occurred_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        event_id
    )
}

/// Result of an append attempt.
#[derive(Debug, Clone)]
pub enum AppendOutcome {
    /// The event was stored.
    Appended(EventRecord),
    /// An event with the same per-tenant idempotency key already exists;
    /// the original is returned and nothing was written.
    Duplicate(EventRecord),
}

impl AppendOutcome {
    /// The stored record, whether fresh or pre-existing.
    #[must_use]
    pub fn record(&self) -> &EventRecord {
        match self {
            Self::Appended(record) | Self::Duplicate(record) => record,
        }
    }

    /// Whether this append hit an existing idempotency key.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Durable, append-only store of game events.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Appends an event. When the record carries an idempotency key that
    /// already exists for the tenant, the append must be a no-op returning
    /// [`AppendOutcome::Duplicate`] — the check-then-insert is atomic.
    async fn append(&self, record: EventRecord) -> Result<AppendOutcome, CoreError>;

    /// All unexpired events for a game, ordered by `(occurred_at, event_id)`.
    async fn list_by_game(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
    ) -> Result<Vec<EventRecord>, CoreError>;

    /// Looks up a single event within a game.
    async fn find(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<EventRecord>, CoreError>;

    /// Sets the `reversed_by` back-reference. Idempotent for the same
    /// reversal id; rejects with `EVENT_ALREADY_REVERSED` when the event
    /// was already reversed by a different one.
    async fn mark_reversed(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
        event_id: Uuid,
        reversal_event_id: Uuid,
    ) -> Result<(), CoreError>;
}
