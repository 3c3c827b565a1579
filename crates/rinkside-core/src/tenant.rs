//! Tenant identifier validation.

use std::fmt;

use uuid::Uuid;

use crate::error::{CoreError, codes};

/// A validated tenant identifier.
///
/// Construction goes through [`TenantId::parse`], so holding a `TenantId`
/// means the empty/malformed/nil cases have already been rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Parses and validates a raw tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_TENANT_ID` if the input is empty, is not a
    /// well-formed UUID, or is the nil UUID.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::tenant_isolation(
                codes::INVALID_TENANT_ID,
                "tenant id is empty",
            ));
        }
        let id = Uuid::parse_str(trimmed).map_err(|_| {
            CoreError::tenant_isolation(
                codes::INVALID_TENANT_ID,
                format!("tenant id is not a well-formed UUID: {trimmed}"),
            )
        })?;
        if id.is_nil() {
            return Err(CoreError::tenant_isolation(
                codes::INVALID_TENANT_ID,
                "tenant id is the nil UUID",
            ));
        }
        Ok(Self(id))
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<TenantId> for Uuid {
    fn from(value: TenantId) -> Self {
        value.0
    }
}
