//! Rig telemetry model.
//!
//! Mirrors the JSON document returned by `GET /main/api/v2/mining/rigs2`.
//! Only the fields the core relies on are mandatory; everything else
//! defaults so a slimmer response still decodes.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::value_objects::DeviceBrand;

/// Per-status counters (`minerStatuses`, `devicesStatuses`), keyed by wire name.
pub type StatusCounters = BTreeMap<String, u64>;

// =============================================================================
// Snapshot
// =============================================================================

/// Root telemetry object for an account.
///
/// A snapshot is replaced wholesale on every successful poll and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigsSnapshot {
    /// Number of rigs on the account
    #[serde(default)]
    pub total_rigs: u32,
    /// Number of devices across all rigs
    #[serde(default)]
    pub total_devices: u32,
    /// Aggregate profitability (BTC/day)
    #[serde(default)]
    pub total_profitability: f64,
    /// Rig counts by miner status
    #[serde(default)]
    pub miner_statuses: StatusCounters,
    /// Device counts by device status
    #[serde(default)]
    pub devices_statuses: StatusCounters,
    /// Aggregate unpaid amount in BTC, kept exactly as sent
    pub unpaid_amount: String,
    /// Payout address
    #[serde(default)]
    pub btc_address: String,
    /// Next payout (epoch millis as a numeric string)
    pub next_payout_timestamp: String,
    /// Last payout (epoch millis as a numeric string)
    #[serde(default)]
    pub last_payout_timestamp: String,
    /// Rigs in API order
    #[serde(default)]
    pub mining_rigs: Vec<MiningRig>,
    /// Page of results this snapshot represents
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl RigsSnapshot {
    /// Next payout as a UTC instant, if the timestamp parses.
    pub fn next_payout_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.next_payout_timestamp)
    }

    /// All devices, rigs in order, then devices in listed order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.mining_rigs.iter().flat_map(|rig| rig.devices.iter())
    }
}

/// Parse a payout timestamp.
///
/// The API sends epoch milliseconds as a decimal string; RFC 3339 is
/// accepted as well since older responses used it.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(millis) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Result paging information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Page size
    pub size: u32,
    /// Zero-based page index
    pub page: u32,
    /// Total number of pages
    pub total_page_count: u32,
}

// =============================================================================
// Rig
// =============================================================================

/// Rig-level miner status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RigStatus {
    /// Mining
    Mining,
    /// Running benchmarks
    Benchmarking,
    /// Reported an error
    Error,
    /// Waiting for work
    Pending,
    /// Disabled by the user
    Disabled,
    /// Not connected
    Offline,
    /// Stopped by the user
    Stopped,
    /// Anything else
    #[serde(other)]
    Unknown,
}

impl Default for RigStatus {
    fn default() -> Self {
        RigStatus::Unknown
    }
}

/// A group of devices managed as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningRig {
    /// Rig id
    pub rig_id: String,
    /// Rig name
    #[serde(default)]
    pub name: String,
    /// Rig type (e.g. `MANAGED`)
    #[serde(default, rename = "type")]
    pub rig_type: String,
    /// Miner status
    #[serde(default)]
    pub miner_status: RigStatus,
    /// Group the rig belongs to
    #[serde(default)]
    pub group_name: String,
    /// Unpaid amount attributed to this rig
    #[serde(default)]
    pub unpaid_amount: String,
    /// Miner software version string
    #[serde(default)]
    pub software_versions: String,
    /// Profitability (BTC/day)
    #[serde(default)]
    pub profitability: f64,
    /// Devices in listed order
    #[serde(default)]
    pub devices: Vec<Device>,
    /// Per-algorithm statistics
    #[serde(default)]
    pub stats: Vec<RigStat>,
}

/// Per-algorithm rig statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigStat {
    /// When the stats were sampled (epoch millis)
    #[serde(default)]
    pub stats_time: i64,
    /// Market region
    #[serde(default)]
    pub market: String,
    /// Algorithm
    #[serde(default)]
    pub algorithm: EnumLabel,
    /// Unpaid amount on this algorithm
    #[serde(default)]
    pub unpaid_amount: String,
    /// Accepted speed
    #[serde(default)]
    pub speed_accepted: f64,
    /// Total rejected speed
    #[serde(default)]
    pub speed_rejected_total: f64,
    /// Profitability (BTC/day)
    #[serde(default)]
    pub profitability: f64,
}

// =============================================================================
// Device
// =============================================================================

/// Generic `{enumName, description}` pair used for intensity, power mode
/// and algorithms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumLabel {
    /// Machine name
    #[serde(default)]
    pub enum_name: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
}

/// Device vendor with its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceType {
    /// Vendor
    pub enum_name: DeviceBrand,
    /// Human readable description
    #[serde(default)]
    pub description: String,
}

/// Device status kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatusKind {
    /// Hashing
    Mining,
    /// Disabled by the user
    Disabled,
    /// Enabled but not hashing
    Inactive,
    /// Running benchmarks
    Benchmarking,
    /// Reported an error
    Error,
    /// Waiting for work
    Pending,
    /// Rig not connected
    Offline,
    /// Anything else
    #[serde(other)]
    Unknown,
}

/// Device status with its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Status kind
    pub enum_name: DeviceStatusKind,
    /// Human readable description
    #[serde(default)]
    pub description: String,
}

/// Wire forms of a speed value.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpeed {
    Exact(Decimal),
    Text(String),
    Other(IgnoredAny),
}

/// A blank speed reads as zero; anything else that is not a number is kept
/// as `None` instead of failing the whole snapshot.
fn lenient_speed<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawSpeed::deserialize(deserializer)? {
        RawSpeed::Exact(value) => Some(value),
        RawSpeed::Text(text) if text.trim().is_empty() => Some(Decimal::ZERO),
        RawSpeed::Text(_) | RawSpeed::Other(_) => None,
    })
}

/// Hash rate for one algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedMeasurement {
    /// Algorithm id (e.g. `DAGGERHASHIMOTO`)
    pub algorithm: String,
    /// Algorithm title
    #[serde(default)]
    pub title: String,
    /// Speed, sent as a decimal string. `None` when the value is not a number.
    #[serde(default, deserialize_with = "lenient_speed")]
    pub speed: Option<Decimal>,
    /// Unit prefix (e.g. `MH`)
    #[serde(default)]
    pub display_suffix: String,
}

/// A single hashing unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Device id
    pub id: String,
    /// Device name
    pub name: String,
    /// Vendor
    pub device_type: DeviceType,
    /// Current status
    pub status: DeviceStatus,
    /// Temperature (°C)
    #[serde(default)]
    pub temperature: f64,
    /// Load (%)
    #[serde(default)]
    pub load: f64,
    /// Fan speed (RPM)
    #[serde(default)]
    pub revolutions_per_minute: f64,
    /// Fan speed (%)
    #[serde(default)]
    pub revolutions_per_minute_percentage: f64,
    /// Power mode
    #[serde(default)]
    pub power_mode: EnumLabel,
    /// Power draw (W)
    #[serde(default)]
    pub power_usage: f64,
    /// Hash rates, first entry is the primary algorithm
    #[serde(default)]
    pub speeds: Vec<SpeedMeasurement>,
    /// Mining intensity
    #[serde(default)]
    pub intensity: EnumLabel,
}

impl Device {
    /// Brand as reported by the API.
    pub fn brand(&self) -> DeviceBrand {
        self.device_type.enum_name
    }

    /// True when the device is hashing.
    pub fn is_mining(&self) -> bool {
        self.status.enum_name == DeviceStatusKind::Mining
    }

    /// True when the device has been disabled.
    pub fn is_disabled(&self) -> bool {
        self.status.enum_name == DeviceStatusKind::Disabled
    }

    /// Primary speed measurement, if any.
    pub fn primary_speed(&self) -> Option<&SpeedMeasurement> {
        self.speeds.first()
    }
}

// =============================================================================
// Tests
// =============================================================================
