//! Presence payload formatting.
//!
//! Turns the current snapshot and selected device into the two text lines
//! shown by the presence display. Everything here is a pure function of
//! its inputs, including `now`, so the daemon ticker and the tests share
//! the exact same code path.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::rigs::{Device, RigsSnapshot, SpeedMeasurement};

/// Placeholder shown when the payout timestamp cannot be parsed.
const UNKNOWN_REMAINING: &str = "--:--:--";

/// Placeholder shown when a speed value cannot be read.
const UNREADABLE_SPEED: &str = "--";

/// Static artwork shown next to the presence text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceAssets {
    /// Image key or URL
    pub large_image_key: String,
    /// Tooltip for the image
    pub large_image_text: String,
}

/// Payload handed to the presence sink on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    /// First line
    pub details: String,
    /// Second line
    pub state: String,
    /// When the presence session began
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_timestamp: DateTime<Utc>,
    /// Image key or URL
    pub large_image_key: String,
    /// Tooltip for the image
    pub large_image_text: String,
}

/// Build the presence payload.
///
/// Returns `None` when no device is selected: there is nothing to report.
/// A selected device that is not mining only reports its name and status.
pub fn format_presence(
    snapshot: &RigsSnapshot,
    device: Option<&Device>,
    now: DateTime<Utc>,
    start_timestamp: DateTime<Utc>,
    assets: &PresenceAssets,
) -> Option<PresencePayload> {
    let device = device?;

    let (details, state) = if device.is_mining() {
        let details = format!(
            "{} ({}) {}W ({})",
            device.name,
            format_speed(device.primary_speed()),
            device.power_usage,
            device.intensity.description
        );
        let state = format!(
            "Next payout {} / Unpaid: {} BTC",
            format_remaining(snapshot.next_payout_at(), now),
            snapshot.unpaid_amount
        );
        (details, state)
    } else {
        (
            format!("Device: {}", device.name),
            format!("Status: {}", device.status.description),
        )
    };

    Some(PresencePayload {
        details,
        state,
        start_timestamp,
        large_image_key: assets.large_image_key.clone(),
        large_image_text: assets.large_image_text.clone(),
    })
}

/// Render the time left until `goal` as `HH:MM:SS`.
///
/// Floors at zero. The hour field is total hours and is not wrapped at 24.
pub fn format_remaining(goal: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(goal) = goal else {
        return UNKNOWN_REMAINING.to_string();
    };

    let total_secs = (goal - now).num_seconds().max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Render a hash rate, e.g. `123.40 MH/s`, or `0` without a measurement.
///
/// A measurement whose value could not be read renders as `-- MH/s`.
pub fn format_speed(speed: Option<&SpeedMeasurement>) -> String {
    match speed {
        Some(speed) => format!(
            "{} {}/s",
            speed
                .speed
                .map(two_fraction_digits)
                .unwrap_or_else(|| UNREADABLE_SPEED.to_string()),
            speed.display_suffix
        ),
        None => "0".to_string(),
    }
}

fn two_fraction_digits(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rigs::{DeviceStatus, DeviceStatusKind, DeviceType, EnumLabel};
    use crate::value_objects::DeviceBrand;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn assets() -> PresenceAssets {
        PresenceAssets {
            large_image_key: "logo".to_string(),
            large_image_text: "NiceHash".to_string(),
        }
    }

    fn speed(value: Decimal) -> SpeedMeasurement {
        SpeedMeasurement {
            algorithm: "DAGGERHASHIMOTO".to_string(),
            title: "DaggerHashimoto".to_string(),
            speed: Some(value),
            display_suffix: "MH".to_string(),
        }
    }

    fn device(status: DeviceStatusKind, description: &str, speeds: Vec<SpeedMeasurement>) -> Device {
        Device {
            id: "gpu-1".to_string(),
            name: "RTX 3070".to_string(),
            device_type: DeviceType {
                enum_name: DeviceBrand::Nvidia,
                description: "Nvidia".to_string(),
            },
            status: DeviceStatus {
                enum_name: status,
                description: description.to_string(),
            },
            temperature: 60.0,
            load: 100.0,
            revolutions_per_minute: 1500.0,
            revolutions_per_minute_percentage: 50.0,
            power_mode: EnumLabel::default(),
            power_usage: 120.0,
            speeds,
            intensity: EnumLabel {
                enum_name: "LOW".to_string(),
                description: "Low power mode".to_string(),
            },
        }
    }

    fn snapshot(next_payout_millis: i64) -> RigsSnapshot {
        RigsSnapshot {
            total_rigs: 1,
            total_devices: 1,
            total_profitability: 0.0,
            miner_statuses: Default::default(),
            devices_statuses: Default::default(),
            unpaid_amount: "0.00003710".to_string(),
            btc_address: String::new(),
            next_payout_timestamp: next_payout_millis.to_string(),
            last_payout_timestamp: String::new(),
            mining_rigs: vec![],
            pagination: None,
        }
    }

    #[test]
    fn test_mining_payload() {
        let snap = snapshot(now().timestamp_millis() + 3_661_000);
        let dev = device(DeviceStatusKind::Mining, "Mining", vec![speed(dec!(123.4))]);
        let start = now() - Duration::minutes(5);

        let payload = format_presence(&snap, Some(&dev), now(), start, &assets()).unwrap();

        assert_eq!(payload.details, "RTX 3070 (123.40 MH/s) 120W (Low power mode)");
        assert_eq!(payload.state, "Next payout 01:01:01 / Unpaid: 0.00003710 BTC");
        assert_eq!(payload.start_timestamp, start);
        assert_eq!(payload.large_image_key, "logo");
    }

    #[test]
    fn test_mining_payload_without_speeds() {
        let snap = snapshot(now().timestamp_millis());
        let dev = device(DeviceStatusKind::Mining, "Mining", vec![]);

        let payload = format_presence(&snap, Some(&dev), now(), now(), &assets()).unwrap();

        assert_eq!(payload.details, "RTX 3070 (0) 120W (Low power mode)");
        assert!(payload.state.starts_with("Next payout 00:00:00"));
    }

    #[test]
    fn test_idle_payload_reports_name_and_status_only() {
        let snap = snapshot(now().timestamp_millis() + 3_661_000);
        let dev = device(DeviceStatusKind::Inactive, "Inactive", vec![speed(dec!(10))]);

        let payload = format_presence(&snap, Some(&dev), now(), now(), &assets()).unwrap();

        assert_eq!(payload.details, "Device: RTX 3070");
        assert_eq!(payload.state, "Status: Inactive");
        assert!(!payload.details.contains("MH/s"));
        assert!(!payload.state.contains("BTC"));
    }

    #[test]
    fn test_no_device_yields_nothing() {
        let snap = snapshot(0);
        assert!(format_presence(&snap, None, now(), now(), &assets()).is_none());
    }

    #[test]
    fn test_remaining_time() {
        let goal = now() + Duration::milliseconds(3_661_000);
        assert_eq!(format_remaining(Some(goal), now()), "01:01:01");
    }

    #[test]
    fn test_remaining_time_hours_not_wrapped() {
        let goal = now() + Duration::hours(30) + Duration::seconds(5);
        assert_eq!(format_remaining(Some(goal), now()), "30:00:05");
    }

    #[test]
    fn test_remaining_time_floors_at_zero() {
        let goal = now() - Duration::minutes(10);
        assert_eq!(format_remaining(Some(goal), now()), "00:00:00");
    }

    #[test]
    fn test_remaining_time_unknown_goal() {
        assert_eq!(format_remaining(None, now()), "--:--:--");
    }

    #[test]
    fn test_speed_rendering() {
        assert_eq!(format_speed(Some(&speed(dec!(123.4)))), "123.40 MH/s");
        assert_eq!(format_speed(Some(&speed(dec!(59.51634)))), "59.52 MH/s");
        assert_eq!(format_speed(Some(&speed(dec!(7)))), "7.00 MH/s");
        assert_eq!(format_speed(None), "0");
    }

    #[test]
    fn test_unreadable_speed_rendering() {
        let mut unreadable = speed(dec!(0));
        unreadable.speed = None;
        assert_eq!(format_speed(Some(&unreadable)), "-- MH/s");
    }

    #[test]
    fn test_payload_uses_first_speed_entry() {
        let snap = snapshot(now().timestamp_millis());
        let dev = device(
            DeviceStatusKind::Mining,
            "Mining",
            vec![speed(dec!(1.5)), speed(dec!(99))],
        );

        let payload = format_presence(&snap, Some(&dev), now(), now(), &assets()).unwrap();
        assert_eq!(payload.details, "RTX 3070 (1.50 MH/s) 120W (Low power mode)");
    }

    #[test]
    fn test_payload_serializes_epoch_start() {
        let payload = PresencePayload {
            details: "d".to_string(),
            state: "s".to_string(),
            start_timestamp: now(),
            large_image_key: "k".to_string(),
            large_image_text: "t".to_string(),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["startTimestamp"], 1_700_000_000_000i64);
        assert_eq!(value["largeImageKey"], "k");
    }
}
