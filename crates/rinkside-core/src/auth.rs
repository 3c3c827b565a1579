//! Identity provider seam.
//!
//! Token verification is an upstream collaborator: the core consumes a
//! verified `{user_id, tenant_id, roles}` context and trusts it
//! completely. Tenant is never re-derived from request bodies.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Verified caller identity attached to every request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The authenticated user.
    pub user_id: Uuid,
    /// Raw tenant identifier as issued by the identity provider. The
    /// tenant guard validates well-formedness at the data boundary.
    pub tenant_id: String,
    /// Role names granted to the user.
    pub roles: Vec<String>,
}

impl AuthContext {
    /// Whether the caller holds the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Typed verification failures from the identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credentials were presented.
    #[error("missing credentials")]
    MissingCredentials,

    /// Credentials were presented but could not be parsed or verified.
    #[error("malformed credentials: {0}")]
    MalformedCredentials(String),

    /// Credentials were valid once but have expired.
    #[error("expired credentials")]
    ExpiredCredentials,

    /// A verified identity with no tenant claim cannot access tenant data.
    #[error("verified identity carries no tenant")]
    MissingTenant,
}

/// Raw credential material extracted from a request.
#[derive(Debug, Default, Clone)]
pub struct RequestCredentials {
    /// `Authorization: Bearer` token, if any.
    pub bearer_token: Option<String>,
    /// Gateway-forwarded identity headers (lowercased names).
    pub forwarded: HashMap<String, String>,
}

/// Upstream identity collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies the presented credentials and returns the caller context.
    ///
    /// # Errors
    ///
    /// Returns a typed [`AuthError`] when credentials are missing,
    /// malformed, expired, or carry no tenant.
    async fn verify(&self, credentials: &RequestCredentials) -> Result<AuthContext, AuthError>;
}
