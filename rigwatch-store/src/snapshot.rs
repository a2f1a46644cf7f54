//! In-memory snapshot store.
//!
//! Thread-safe using RwLock for concurrent access. The lock guards a single
//! `Arc` so a reader never sees a snapshot paired with a device selected
//! from a different snapshot.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use rigwatch_domain::{Device, RigsSnapshot};

/// A snapshot together with the device selected from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    snapshot: RigsSnapshot,
    selected: Option<Device>,
    fetched_at: DateTime<Utc>,
}

impl SnapshotEntry {
    /// The rigs snapshot.
    pub fn snapshot(&self) -> &RigsSnapshot {
        &self.snapshot
    }

    /// Device selected from this snapshot, if any qualified.
    pub fn selected(&self) -> Option<&Device> {
        self.selected.as_ref()
    }

    /// When the snapshot was stored.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// How old the entry is at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }
}

/// Latest successfully fetched snapshot and its selected device.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<SnapshotEntry>>>,
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current pairing.
    ///
    /// Only called after a successful fetch; failed cycles leave the
    /// previous pairing in place.
    pub fn replace(&self, snapshot: RigsSnapshot, selected: Option<Device>) {
        let entry = Arc::new(SnapshotEntry {
            snapshot,
            selected,
            fetched_at: Utc::now(),
        });

        debug!(
            rigs = entry.snapshot.mining_rigs.len(),
            selected = ?entry.selected.as_ref().map(|d| d.id.as_str()),
            "Snapshot replaced"
        );

        // A poisoned slot still holds a complete Arc
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Some(entry);
    }

    /// Read the current pairing, or `None` before the first successful fetch.
    pub fn read(&self) -> Option<Arc<SnapshotEntry>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drop the current pairing.
    pub fn clear(&self) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
