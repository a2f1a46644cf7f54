//! NiceHash REST API client for mining rig telemetry.
//!
//! Provides REST API integration for:
//! - Fetching the account's rigs and devices (`GET /main/api/v2/mining/rigs2`)
//! - Authentication via per-request HMAC SHA256 signatures
//!
//! # Authentication
//!
//! Every request carries a fresh millisecond timestamp and a random nonce.
//! Headers:
//! - `X-Time`, `X-Nonce`, `X-Organization-Id`
//! - `X-Request-Id` (same value as the nonce)
//! - `X-User-Agent`, `X-User-Lang`
//! - `X-Auth` (see [`crate::signer`])

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::debug;

use rigwatch_domain::{Credentials, RigsSnapshot};

use crate::error::RigApiError;
use crate::ports::RigSource;
use crate::signer::sign;
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport};

// =============================================================================
// Constants
// =============================================================================

/// NiceHash API base URL
pub const NICEHASH_API_URL: &str = "https://api2.nicehash.com";

/// Rigs endpoint
pub const RIGS_ENDPOINT: &str = "/main/api/v2/mining/rigs2";

/// Value of the `X-User-Agent` header
const USER_AGENT: &str = concat!("rigwatch/", env!("CARGO_PKG_VERSION"));

/// Random bytes per nonce
const NONCE_BYTES: usize = 16;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Configuration
// =============================================================================

/// Client settings that are not credentials.
#[derive(Debug, Clone)]
pub struct NicehashClientConfig {
    /// API base URL
    pub base_url: String,
    /// Value of the `X-User-Lang` header
    pub user_lang: String,
    /// Deadline for a single request
    pub request_timeout: Duration,
}

impl Default for NicehashClientConfig {
    fn default() -> Self {
        Self {
            base_url: NICEHASH_API_URL.to_string(),
            user_lang: "en".to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// NiceHash Client
// =============================================================================

/// NiceHash REST API client.
pub struct NicehashClient<T: HttpTransport = ReqwestTransport> {
    /// HTTP transport
    transport: T,
    /// Signing credentials
    credentials: Credentials,
    /// Client settings
    config: NicehashClientConfig,
}

impl NicehashClient<ReqwestTransport> {
    /// Create a client backed by reqwest.
    pub fn new(credentials: Credentials, config: NicehashClientConfig) -> Self {
        Self::with_transport(ReqwestTransport::new(), credentials, config)
    }
}

impl<T: HttpTransport> NicehashClient<T> {
    /// Create a client over a custom transport.
    pub fn with_transport(transport: T, credentials: Credentials, config: NicehashClientConfig) -> Self {
        Self {
            transport,
            credentials,
            config,
        }
    }

    /// Fetch the rigs snapshot.
    ///
    /// Generates a fresh timestamp and nonce for every call.
    ///
    /// # Endpoint
    ///
    /// `GET /main/api/v2/mining/rigs2`
    pub async fn fetch_rigs(&self) -> Result<RigsSnapshot, RigApiError> {
        let time = Utc::now().timestamp_millis();
        let nonce = generate_nonce();

        let body = self.get_signed(RIGS_ENDPOINT, time, &nonce).await?;

        let snapshot: RigsSnapshot =
            serde_json::from_str(&body).map_err(|e| RigApiError::Decode(e.to_string()))?;

        debug!(
            rigs = snapshot.mining_rigs.len(),
            devices = snapshot.total_devices,
            "Rigs snapshot decoded"
        );

        Ok(snapshot)
    }

    /// Build the authentication headers for a request.
    fn signed_headers(
        &self,
        method: &str,
        endpoint: &str,
        time: i64,
        nonce: &str,
    ) -> Result<Vec<(&'static str, String)>, RigApiError> {
        let auth = sign(method, endpoint, time, nonce, &self.credentials, None, None)?;

        Ok(vec![
            ("X-Time", time.to_string()),
            ("X-Nonce", nonce.to_string()),
            ("X-Organization-Id", self.credentials.org_id().to_string()),
            ("X-Request-Id", nonce.to_string()),
            ("X-User-Agent", USER_AGENT.to_string()),
            ("X-User-Lang", self.config.user_lang.clone()),
            ("X-Auth", auth),
        ])
    }

    /// Send a signed GET request and return the body of a 2xx response.
    async fn get_signed(&self, endpoint: &str, time: i64, nonce: &str) -> Result<String, RigApiError> {
        let headers = self.signed_headers("GET", endpoint, time, nonce)?;
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);

        debug!(%url, "Sending signed request");

        let response = timeout(self.config.request_timeout, self.transport.get(&url, &headers))
            .await
            .map_err(|_| RigApiError::Timeout)??;

        if !response.is_success() {
            return Err(error_from_response(response));
        }

        Ok(response.body)
    }
}

#[async_trait]
impl<T: HttpTransport> RigSource for NicehashClient<T> {
    async fn fetch_rigs(&self) -> Result<RigsSnapshot, RigApiError> {
        NicehashClient::fetch_rigs(self).await
    }
}

/// Random request nonce: 16 bytes from the OS RNG, base64 encoded.
fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Map a non-success response to an error.
fn error_from_response(response: HttpResponse) -> RigApiError {
    // Try to parse NiceHash error response
    let message = serde_json::from_str::<NicehashErrorResponse>(&response.body)
        .ok()
        .and_then(|err| err.errors.into_iter().next())
        .map(|entry| format!("{} (code {})", entry.message, entry.code))
        .unwrap_or(response.body);

    match response.status {
        401 | 403 => RigApiError::Auth {
            status: response.status,
            message,
        },
        status => RigApiError::Http { status, message },
    }
}

// =============================================================================
// NiceHash Types (from API responses)
// =============================================================================

/// NiceHash error response.
#[derive(Debug, Deserialize)]
struct NicehashErrorResponse {
    #[serde(default)]
    errors: Vec<NicehashErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct NicehashErrorEntry {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

// =============================================================================
// Tests
// =============================================================================
