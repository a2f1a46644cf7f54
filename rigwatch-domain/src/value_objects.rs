//! Value Objects for the rigwatch domain
//!
//! Small validated primitives shared by the model and the daemon config.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Device brand preference is not one we can select on
    #[error("Invalid device brand: {0}. Expected: NVIDIA, AMD")]
    InvalidBrand(String),

    /// Credential field is empty
    #[error("Missing credential field: {0}")]
    MissingCredential(&'static str),
}

// =============================================================================
// DeviceBrand
// =============================================================================

/// Hardware vendor reported in a device's `deviceType.enumName`.
///
/// Vendors the API may add later decode into [`DeviceBrand::Unknown`] so
/// a new device kind never breaks snapshot decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceBrand {
    /// NVIDIA graphics card
    Nvidia,
    /// AMD graphics card
    Amd,
    /// CPU miner
    Cpu,
    /// Anything else
    #[serde(other)]
    Unknown,
}

impl DeviceBrand {
    /// Wire name as sent by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceBrand::Nvidia => "NVIDIA",
            DeviceBrand::Amd => "AMD",
            DeviceBrand::Cpu => "CPU",
            DeviceBrand::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for DeviceBrand {
    type Err = DomainError;

    /// Parses a brand preference. Only GPU vendors are valid preferences.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NVIDIA" => Ok(DeviceBrand::Nvidia),
            "AMD" => Ok(DeviceBrand::Amd),
            _ => Err(DomainError::InvalidBrand(s.to_string())),
        }
    }
}

impl Default for DeviceBrand {
    fn default() -> Self {
        DeviceBrand::Nvidia
    }
}

impl fmt::Display for DeviceBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
