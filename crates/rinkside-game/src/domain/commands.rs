//! Commands for the scoring context.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rinkside_core::event::SpatialCoordinates;

/// An inbound scoring action, as received from the transport layer.
///
/// `tenant_id` and `event_type` stay in their raw wire forms here; the
/// write path validates both before anything touches a store.
#[derive(Debug, Clone)]
pub struct RecordGameAction {
    /// Tenant from the verified auth context.
    pub tenant_id: String,
    /// Target game.
    pub game_id: Uuid,
    /// Event type in wire form, e.g. `"GOAL_SCORED"`.
    pub event_type: String,
    /// Raw event payload.
    pub payload: serde_json::Value,
    /// Client-supplied occurrence time; server receipt time when absent.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Caller retry token, unique per tenant.
    pub idempotency_key: Option<String>,
    /// Optional playing-surface coordinates.
    pub coordinates: Option<SpatialCoordinates>,
    /// Submitting user from the verified auth context.
    pub user_id: Uuid,
    /// Submitting client, e.g. `"scorekeeper-app"`.
    pub source: String,
    /// Client IP, when known.
    pub ip_address: Option<String>,
}
