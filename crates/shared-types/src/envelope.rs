//! # `AuthenticatedCall` Envelope
//!
//! The wrapper for every callable marketplace operation.
//!
//! ## Security Properties
//!
//! - **Envelope Authority**: `caller` is the sole source of truth for identity.
//!   Payloads MUST NOT carry a poster/helper/actor id for the acting user.
//! - **Correlation**: every call carries a `correlation_id` that is copied into
//!   the events and log spans it produces.
//! - **No Issuance**: claims are produced by an external identity provider; this
//!   crate only consumes them.

use crate::errors::ServiceError;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role claim attached to a verified identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Verified identity claims of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub uid: String,
    #[serde(default)]
    pub role: Role,
}

impl IdentityClaims {
    pub fn user(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            role: Role::User,
        }
    }

    pub fn admin(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            role: Role::Admin,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Envelope for all callable operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedCall<T> {
    /// Unique identifier for correlating logs and emitted events.
    pub correlation_id: Uuid,

    /// Milliseconds since epoch when the call was received.
    pub issued_at: Timestamp,

    /// Claims of the caller, `None` when the transport could not verify one.
    pub caller: Option<IdentityClaims>,

    /// Operation payload.
    pub payload: T,
}

impl<T> AuthenticatedCall<T> {
    pub fn new(caller: Option<IdentityClaims>, issued_at: Timestamp, payload: T) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            issued_at,
            caller,
            payload,
        }
    }

    /// Convenience constructor for a verified caller.
    pub fn from_user(caller: IdentityClaims, issued_at: Timestamp, payload: T) -> Self {
        Self::new(Some(caller), issued_at, payload)
    }

    /// Returns the verified caller or `Unauthenticated`.
    pub fn require_caller(&self) -> Result<&IdentityClaims, ServiceError> {
        match &self.caller {
            Some(claims) if !claims.uid.trim().is_empty() => Ok(claims),
            _ => Err(ServiceError::Unauthenticated),
        }
    }

    /// Returns the verified caller if it holds the admin role.
    pub fn require_admin(&self) -> Result<&IdentityClaims, ServiceError> {
        let claims = self.require_caller()?;
        if claims.is_admin() {
            Ok(claims)
        } else {
            Err(ServiceError::PermissionDenied("admin role required".into()))
        }
    }
}
