//! rigwatch Storage Layer
//!
//! Holds the latest rigs snapshot together with the device selected from it.
//!
//! # Architecture
//!
//! - **SnapshotStore**: single writer (the poller), many readers (the
//!   presence ticker and anyone else holding the `Arc`)
//! - Snapshot and selected device are swapped as one unit
//!
//! # Usage
//!
//! ```rust
//! use rigwatch_store::SnapshotStore;
//!
//! let store = SnapshotStore::new();
//! assert!(store.read().is_none());
//! ```

#![warn(clippy::all)]

// Modules
mod snapshot;

// Re-exports
pub use snapshot::{SnapshotEntry, SnapshotStore};
