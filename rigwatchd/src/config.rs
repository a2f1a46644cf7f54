//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Credentials are required; everything else has a default.

use std::env;
use std::time::Duration;

use rigwatch_connectors::nicehash_rest::NICEHASH_API_URL;
use rigwatch_connectors::NicehashClientConfig;
use rigwatch_domain::{Credentials, DeviceBrand, PresenceAssets};

use crate::error::{DaemonError, DaemonResult};
use crate::poller::PollerConfig;
use crate::presence::PresenceConfig;

/// Default presence image key
const DEFAULT_LARGE_IMAGE_KEY: &str = "nicehash_logo";

/// Default presence image text
const DEFAULT_LARGE_IMAGE_TEXT: &str = "NiceHash";

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API credentials
    pub credentials: Credentials,

    /// Brand of the device to report on
    pub device_brand: DeviceBrand,

    /// API client configuration
    pub api: ApiConfig,

    /// Rig refresh configuration
    pub poller: PollerConfig,

    /// Presence tick configuration
    pub presence: PresenceConfig,
}

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL
    pub base_url: String,
    /// `X-User-Lang` header value
    pub user_lang: String,
    /// Per-request deadline
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> DaemonResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Self::load_credentials(&lookup)?;

        let device_brand = match lookup("RIGWATCH_DEVICE_BRAND") {
            Some(raw) => raw.parse::<DeviceBrand>()?,
            None => DeviceBrand::default(),
        };

        let api = ApiConfig {
            base_url: lookup("RIGWATCH_API_URL").unwrap_or_else(|| NICEHASH_API_URL.to_string()),
            user_lang: lookup("RIGWATCH_USER_LANG").unwrap_or_else(|| "en".to_string()),
            request_timeout: Self::load_secs(&lookup, "RIGWATCH_REQUEST_TIMEOUT_SECS", 10)?,
        };

        let poller = PollerConfig {
            interval: Self::load_secs(&lookup, "RIGWATCH_POLL_INTERVAL_SECS", 60)?,
            max_backoff: Self::load_secs(&lookup, "RIGWATCH_MAX_BACKOFF_SECS", 900)?,
        };

        let presence = PresenceConfig {
            interval: Self::load_secs(&lookup, "RIGWATCH_PRESENCE_INTERVAL_SECS", 1)?,
            assets: PresenceAssets {
                large_image_key: lookup("RIGWATCH_LARGE_IMAGE_KEY")
                    .unwrap_or_else(|| DEFAULT_LARGE_IMAGE_KEY.to_string()),
                large_image_text: lookup("RIGWATCH_LARGE_IMAGE_TEXT")
                    .unwrap_or_else(|| DEFAULT_LARGE_IMAGE_TEXT.to_string()),
            },
        };

        if poller.max_backoff < poller.interval {
            return Err(DaemonError::Config(format!(
                "RIGWATCH_MAX_BACKOFF_SECS ({}) must be at least RIGWATCH_POLL_INTERVAL_SECS ({})",
                poller.max_backoff.as_secs(),
                poller.interval.as_secs()
            )));
        }

        Ok(Self {
            credentials,
            device_brand,
            api,
            poller,
            presence,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            credentials: Self::test_credentials(),
            device_brand: DeviceBrand::Nvidia,
            api: ApiConfig {
                base_url: "http://127.0.0.1:0".to_string(),
                user_lang: "en".to_string(),
                request_timeout: Duration::from_secs(1),
            },
            poller: PollerConfig {
                interval: Duration::from_secs(60),
                max_backoff: Duration::from_secs(240),
            },
            presence: PresenceConfig {
                interval: Duration::from_secs(1),
                assets: PresenceAssets {
                    large_image_key: DEFAULT_LARGE_IMAGE_KEY.to_string(),
                    large_image_text: DEFAULT_LARGE_IMAGE_TEXT.to_string(),
                },
            },
        }
    }

    /// Settings for the REST client.
    pub fn client_config(&self) -> NicehashClientConfig {
        NicehashClientConfig {
            base_url: self.api.base_url.clone(),
            user_lang: self.api.user_lang.clone(),
            request_timeout: self.api.request_timeout,
        }
    }

    fn test_credentials() -> Credentials {
        match Credentials::new("test-key", "test-secret", "test-org") {
            Ok(creds) => creds,
            Err(e) => unreachable!("static test credentials are valid: {}", e),
        }
    }

    fn load_credentials<F>(lookup: &F) -> DaemonResult<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| DaemonError::Config(format!("Missing required {}", key)))
        };

        let api_key = required("RIGWATCH_API_KEY")?;
        let api_secret = required("RIGWATCH_API_SECRET")?;
        let org_id = required("RIGWATCH_ORG_ID")?;

        Ok(Credentials::new(api_key, api_secret, org_id)?)
    }

    fn load_secs<F>(lookup: &F, key: &str, default: u64) -> DaemonResult<Duration>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = match lookup(key) {
            Some(val) => val
                .trim()
                .parse::<u64>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val)))?,
            None => default,
        };

        if secs == 0 {
            return Err(DaemonError::Config(format!("{} must be greater than zero", key)));
        }

        Ok(Duration::from_secs(secs))
    }
}

// =============================================================================
// Tests
// =============================================================================
