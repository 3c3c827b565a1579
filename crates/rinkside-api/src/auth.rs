//! Identity extraction for request handlers.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use rinkside_core::auth::{AuthContext, AuthError, IdentityProvider, RequestCredentials};

use crate::error::ApiError;
use crate::state::AppState;

/// Identity provider that trusts gateway-verified forwarded headers.
///
/// Token cryptography terminates at the edge gateway, which forwards the
/// verified identity as `x-user-id`, `x-tenant-id`, and `x-roles`. Tenant
/// is taken from this context only — never from request bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedHeaderIdentity;

#[async_trait]
impl IdentityProvider for TrustedHeaderIdentity {
    async fn verify(&self, credentials: &RequestCredentials) -> Result<AuthContext, AuthError> {
        let user_raw = credentials
            .forwarded
            .get("x-user-id")
            .ok_or(AuthError::MissingCredentials)?;
        let user_id = Uuid::parse_str(user_raw)
            .map_err(|_| AuthError::MalformedCredentials(format!("x-user-id: {user_raw}")))?;

        let tenant_id = credentials
            .forwarded
            .get("x-tenant-id")
            .ok_or(AuthError::MissingTenant)?
            .clone();

        let roles = credentials
            .forwarded
            .get("x-roles")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(AuthContext {
            user_id,
            tenant_id,
            roles,
        })
    }
}

/// Extractor placing the verified caller identity into handlers.
#[derive(Debug, Clone)]
pub struct Identity(pub AuthContext);

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer_token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(ToOwned::to_owned);

        let forwarded = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                let name = name.as_str().to_lowercase();
                if !name.starts_with("x-") {
                    return None;
                }
                value.to_str().ok().map(|v| (name, v.to_owned()))
            })
            .collect();

        let credentials = RequestCredentials {
            bearer_token,
            forwarded,
        };
        let context = state.identity.verify(&credentials).await?;
        Ok(Self(context))
    }
}
