//! Domain error taxonomy.
//!
//! Every fallible operation in the scoring pipeline returns [`CoreError`].
//! The variants map one-to-one onto the propagation policy: validation and
//! conflict errors are deterministic and returned to the caller unretried;
//! tenant-isolation errors are surfaced as authorization failures after
//! being logged; service-unavailable errors are transient and safe to
//! retry with backoff.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Machine-readable error codes carried alongside human-readable messages.
pub mod codes {
    /// Tenant id missing, empty, or not a well-formed UUID.
    pub const INVALID_TENANT_ID: &str = "INVALID_TENANT_ID";
    /// Query text does not reference a `tenant_id` condition.
    pub const QUERY_MISSING_TENANT_FILTER: &str = "QUERY_MISSING_TENANT_FILTER";
    /// A returned row belongs to a different tenant.
    pub const TENANT_ISOLATION_VIOLATION: &str = "TENANT_ISOLATION_VIOLATION";
    /// Payload failed structural or semantic validation.
    pub const INVALID_PAYLOAD: &str = "INVALID_PAYLOAD";
    /// Event type string is outside the closed set.
    pub const UNKNOWN_EVENT_TYPE: &str = "UNKNOWN_EVENT_TYPE";
    /// `occurred_at` is in the future or older than the late-event window.
    pub const INVALID_TIMESTAMP: &str = "INVALID_TIMESTAMP";
    /// New events are rejected once a game is final.
    pub const GAME_ALREADY_FINALIZED: &str = "GAME_ALREADY_FINALIZED";
    /// Reversal target does not exist for the game.
    pub const EVENT_NOT_FOUND: &str = "EVENT_NOT_FOUND";
    /// Reversal target has already been reversed by a different event.
    pub const EVENT_ALREADY_REVERSED: &str = "EVENT_ALREADY_REVERSED";
    /// Reversal target is not one of the reversible event types.
    pub const EVENT_NOT_REVERSIBLE: &str = "EVENT_NOT_REVERSIBLE";
    /// Reversing the goal would take the team's score below zero.
    pub const SCORE_WOULD_GO_NEGATIVE: &str = "SCORE_WOULD_GO_NEGATIVE";
}

/// A single field-level validation failure, suitable for client display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted path of the offending field within the payload.
    pub field: String,
    /// What was wrong with it.
    pub message: String,
}

impl FieldViolation {
    /// Creates a field violation.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Top-level error type for the scoring pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or out-of-range input. Deterministic; never retried.
    #[error("{message}")]
    Validation {
        /// Machine-readable code from [`codes`].
        code: &'static str,
        /// Human-readable summary.
        message: String,
        /// Field-level detail for client display.
        fields: Vec<FieldViolation>,
    },

    /// The resource is absent or outside the caller's tenant scope.
    /// The two cases are indistinguishable to prevent tenant enumeration.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource kind, e.g. `"game"` or `"season"`.
        resource: &'static str,
        /// The requested identifier.
        id: Uuid,
    },

    /// The request conflicts with current state (already finalized,
    /// already reversed, non-reversible, score floor).
    #[error("{message}")]
    Conflict {
        /// Machine-readable code from [`codes`].
        code: &'static str,
        /// Human-readable summary.
        message: String,
    },

    /// Guard-level tenant isolation failure. Always surfaced to callers
    /// as an authorization failure.
    #[error("{message}")]
    TenantIsolation {
        /// Machine-readable code from [`codes`].
        code: &'static str,
        /// Human-readable summary.
        message: String,
    },

    /// A downstream store is unreachable or timed out. Transient; callers
    /// should retry with backoff.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Unexpected infrastructure failure (broken invariant, undecodable
    /// row). Not retryable, not the caller's fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Convenience constructor for a validation error without field detail.
    #[must_use]
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Validation error carrying field-level detail.
    #[must_use]
    pub fn validation_fields(
        code: &'static str,
        message: impl Into<String>,
        fields: Vec<FieldViolation>,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            fields,
        }
    }

    /// Convenience constructor for a conflict error.
    #[must_use]
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    /// Convenience constructor for a tenant isolation error.
    #[must_use]
    pub fn tenant_isolation(code: &'static str, message: impl Into<String>) -> Self {
        Self::TenantIsolation {
            code,
            message: message.into(),
        }
    }

    /// The machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. }
            | Self::Conflict { code, .. }
            | Self::TenantIsolation { code, .. } => code,
            Self::NotFound { resource, .. } => match *resource {
                "game" => "GAME_NOT_FOUND",
                "event" => "EVENT_NOT_FOUND",
                "season" => "SEASON_NOT_FOUND",
                "league" => "LEAGUE_NOT_FOUND",
                "connection" => "CONNECTION_NOT_FOUND",
                _ => "NOT_FOUND",
            },
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
