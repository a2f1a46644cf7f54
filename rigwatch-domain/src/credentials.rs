//! API Credentials
//!
//! Key, secret and organization id used to sign every request.
//!
//! # Security Model
//!
//! - The secret is wrapped in `Zeroizing` and wiped when dropped
//! - `Debug` output never contains the secret
//! - Values are immutable once constructed

use std::fmt;

use zeroize::Zeroizing;

use crate::value_objects::DomainError;

/// Credentials for the rig management API.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: Zeroizing<String>,
    org_id: String,
}

impl Credentials {
    /// Create credentials, rejecting empty fields.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        org_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let api_key = api_key.into();
        let api_secret = Zeroizing::new(api_secret.into());
        let org_id = org_id.into();

        if api_key.trim().is_empty() {
            return Err(DomainError::MissingCredential("api_key"));
        }
        if api_secret.trim().is_empty() {
            return Err(DomainError::MissingCredential("api_secret"));
        }
        if org_id.trim().is_empty() {
            return Err(DomainError::MissingCredential("org_id"));
        }

        Ok(Self {
            api_key,
            api_secret,
            org_id,
        })
    }

    /// Public API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// HMAC secret.
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Organization id.
    pub fn org_id(&self) -> &str {
        &self.org_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("org_id", &self.org_id)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
