//! rigwatch Daemon Library
//!
//! Runtime orchestrator that keeps a live view of a mining device and
//! feeds it to a presence display.
//!
//! # Architecture
//!
//! ```text
//! Poller → RigSource (signed REST) → select_device → SnapshotStore
//!                                                        ↓ (read-only)
//!                                   PresenceTicker → PresenceSink
//! ```
//!
//! # Components
//!
//! - **Daemon**: startup state machine and shutdown
//! - **Poller**: 60 s rig refresh with capped backoff
//! - **Presence**: 1 s payload formatting and the sink port
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use rigwatchd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     Daemon::from_config(config).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod daemon;
pub mod error;
pub mod poller;
pub mod presence;

// Re-exports for convenience
pub use config::{ApiConfig, Config};
pub use daemon::{Daemon, Phase, RunningDaemon};
pub use error::{DaemonError, DaemonResult};
pub use poller::{Backoff, PollOutcome, Poller, PollerConfig};
pub use presence::{PresenceConfig, PresenceSink, PresenceTicker, TracingSink};
