//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Poller (rig refresh)
//! - Snapshot Store (shared state)
//! - Presence Ticker (payload formatting)
//! - Presence Sink (external display)
//!
//! # Lifecycle
//!
//! 1. Load configuration (credentials resolved)
//! 2. `Initializing`: connect the presence sink, record the session start
//! 3. `Polling`: spawn the poller and the presence ticker, exactly once
//! 4. Graceful shutdown on SIGINT: cancel both tasks, clear the presence
//!
//! `Daemon::start` consumes the daemon and returns a [`RunningDaemon`],
//! so the timers cannot be started twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rigwatch_connectors::{NicehashClient, RigSource};
use rigwatch_store::SnapshotStore;

use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};
use crate::poller::Poller;
use crate::presence::{PresenceSink, PresenceTicker, TracingSink};

// =============================================================================
// Daemon
// =============================================================================

/// Startup phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Configuration loaded, timers not running
    Initializing,
    /// Both timers running
    Polling,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Initializing => write!(f, "initializing"),
            Phase::Polling => write!(f, "polling"),
        }
    }
}

/// The rigwatch daemon, in the `Initializing` phase.
pub struct Daemon {
    /// Configuration
    config: Config,
    /// Rig snapshot source
    source: Arc<dyn RigSource>,
    /// Presence display
    sink: Arc<dyn PresenceSink>,
    /// Shared snapshot store
    store: Arc<SnapshotStore>,
}

impl Daemon {
    /// Create a daemon talking to the real API and logging presence.
    pub fn from_config(config: Config) -> Self {
        let client = NicehashClient::new(config.credentials.clone(), config.client_config());
        Self::new(config, Arc::new(client), Arc::new(TracingSink::new()))
    }

    /// Create a new daemon with provided components.
    pub fn new(config: Config, source: Arc<dyn RigSource>, sink: Arc<dyn PresenceSink>) -> Self {
        Self {
            config,
            source,
            sink,
            store: Arc::new(SnapshotStore::new()),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        Phase::Initializing
    }

    /// Shared snapshot store.
    pub fn store(&self) -> Arc<SnapshotStore> {
        self.store.clone()
    }

    /// Enter the `Polling` phase.
    ///
    /// Waits for the presence sink, records the session start once and
    /// spawns both timers.
    pub async fn start(self) -> DaemonResult<RunningDaemon> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            phase = %self.phase(),
            brand = %self.config.device_brand,
            "Starting rigwatch daemon"
        );

        self.sink.connect().await?;
        let start_timestamp = Utc::now();

        let shutdown_token = CancellationToken::new();

        let poller = Arc::new(Poller::new(
            self.source.clone(),
            self.store.clone(),
            self.config.device_brand,
            self.config.poller.clone(),
            shutdown_token.child_token(),
        ));

        let ticker = Arc::new(PresenceTicker::new(
            self.store.clone(),
            self.sink.clone(),
            self.config.presence.clone(),
            start_timestamp,
            shutdown_token.child_token(),
        ));

        let poll_task = poller.start();
        let presence_task = ticker.start();

        info!(phase = %Phase::Polling, %start_timestamp, "Daemon running");

        Ok(RunningDaemon {
            store: self.store,
            sink: self.sink,
            start_timestamp,
            shutdown_token,
            poll_task,
            presence_task,
        })
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT).
    pub async fn run(self) -> DaemonResult<()> {
        let running = self.start().await?;

        let signal = tokio::signal::ctrl_c().await;
        info!(session_start = %running.start_timestamp(), "Received shutdown signal");

        let shutdown = running.shutdown().await;
        signal.map_err(|e| DaemonError::Signal(e.to_string()))?;
        shutdown
    }
}

// =============================================================================
// Running Daemon
// =============================================================================

/// The daemon in the `Polling` phase.
pub struct RunningDaemon {
    store: Arc<SnapshotStore>,
    sink: Arc<dyn PresenceSink>,
    start_timestamp: DateTime<Utc>,
    shutdown_token: CancellationToken,
    poll_task: JoinHandle<()>,
    presence_task: JoinHandle<()>,
}

impl RunningDaemon {
    /// Current phase.
    pub fn phase(&self) -> Phase {
        Phase::Polling
    }

    /// Shared snapshot store.
    pub fn store(&self) -> Arc<SnapshotStore> {
        self.store.clone()
    }

    /// When the presence session began.
    pub fn start_timestamp(&self) -> DateTime<Utc> {
        self.start_timestamp
    }

    /// Graceful shutdown: stop both timers, clear the presence, drop state.
    pub async fn shutdown(self) -> DaemonResult<()> {
        info!("Initiating graceful shutdown");
        self.shutdown_token.cancel();

        let (poll, presence) = tokio::join!(self.poll_task, self.presence_task);
        poll.map_err(|e| DaemonError::Task(format!("poller: {}", e)))?;
        presence.map_err(|e| DaemonError::Task(format!("presence ticker: {}", e)))?;

        if let Err(e) = self.sink.clear().await {
            warn!(error = %e, "Failed to clear presence");
        }

        self.store.clear();
        info!("Shutdown complete");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
