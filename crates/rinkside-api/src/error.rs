//! Rinkside — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rinkside_core::auth::AuthError;
use rinkside_core::error::{CoreError, FieldViolation};
use serde::Serialize;
use thiserror::Error;

/// Startup errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection, pool, or migration error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Field-level validation detail, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

/// HTTP-layer wrapper around core and auth errors.
#[derive(Debug)]
pub enum ApiError {
    /// Identity verification failed.
    Auth(AuthError),
    /// A pipeline error from the lower crates.
    Core(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(err) => {
                let code = match err {
                    AuthError::MissingCredentials => "MISSING_CREDENTIALS",
                    AuthError::MalformedCredentials(_) => "MALFORMED_CREDENTIALS",
                    AuthError::ExpiredCredentials => "EXPIRED_CREDENTIALS",
                    AuthError::MissingTenant => "MISSING_TENANT",
                };
                let body = ErrorBody {
                    error: code,
                    message: err.to_string(),
                    details: None,
                };
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            Self::Core(err) => {
                let status = match &err {
                    CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
                    CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                    CoreError::Conflict { .. } => StatusCode::CONFLICT,
                    // Guard violations surface as authorization failures.
                    CoreError::TenantIsolation { .. } => StatusCode::FORBIDDEN,
                    CoreError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let details = match &err {
                    CoreError::Validation { fields, .. } if !fields.is_empty() => {
                        Some(fields.clone())
                    }
                    _ => None,
                };
                let body = ErrorBody {
                    error: err.code(),
                    message: err.to_string(),
                    details,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
