//! rigwatch Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains the rig telemetry model, credentials, device selection
//! and presence formatting.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![recursion_limit = "256"]

// Public modules
pub mod credentials;
pub mod presence;
pub mod rigs;
pub mod selector;
pub mod value_objects;

// Re-export commonly used types
pub use credentials::Credentials;
pub use presence::{
    format_presence, format_remaining, format_speed, PresenceAssets, PresencePayload,
};
pub use rigs::{
    Device, DeviceStatus, DeviceStatusKind, DeviceType, EnumLabel, MiningRig, Pagination,
    RigStat, RigStatus, RigsSnapshot, SpeedMeasurement, StatusCounters,
};
pub use selector::select_device;
pub use value_objects::{DeviceBrand, DomainError};
