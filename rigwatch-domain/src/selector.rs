//! Device selection.
//!
//! Picks the single device the presence display reports on.

use crate::rigs::{Device, RigsSnapshot};
use crate::value_objects::DeviceBrand;

/// Select the device of interest from a snapshot.
///
/// Rigs are scanned in snapshot order and devices in listed order. The
/// first device of the preferred brand that is not disabled wins.
///
/// Returns `None` when nothing qualifies. That means "nothing to report",
/// which is different from a selected device that is merely idle.
pub fn select_device(snapshot: &RigsSnapshot, brand: DeviceBrand) -> Option<Device> {
    snapshot
        .devices()
        .find(|device| device.brand() == brand && !device.is_disabled())
        .cloned()
}

// =============================================================================
// Tests
// =============================================================================
