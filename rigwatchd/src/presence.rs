//! Presence ticker and sink.
//!
//! The ticker reads the snapshot store on a fast fixed period, formats
//! the presence payload and hands it to a [`PresenceSink`]. The real
//! display transport lives outside this crate; [`TracingSink`] is the
//! built-in sink and simply logs what would be shown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use rigwatch_domain::{format_presence, PresenceAssets, PresencePayload};
use rigwatch_store::SnapshotStore;

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Configuration
// =============================================================================

/// Presence ticker configuration.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Tick period
    pub interval: Duration,
    /// Artwork attached to every payload
    pub assets: PresenceAssets,
}

// =============================================================================
// Sink Port
// =============================================================================

/// Port for the external presence display.
#[async_trait]
pub trait PresenceSink: Send + Sync {
    /// Resolve once the sink is ready to accept payloads.
    async fn connect(&self) -> DaemonResult<()>;

    /// Show a payload. Called once per tick.
    async fn set_activity(&self, payload: &PresencePayload) -> DaemonResult<()>;

    /// Remove whatever is shown. Called once on shutdown.
    async fn clear(&self) -> DaemonResult<()>;
}

/// How a payload differs from the one shown before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PresenceChange {
    /// Nothing changed
    Unchanged,
    /// Only the second line changed (e.g. the payout countdown)
    State,
    /// The first line changed, or nothing was shown before
    Details,
}

impl PresenceChange {
    fn between(last: Option<&PresencePayload>, next: &PresencePayload) -> Self {
        match last {
            Some(last) if last == next => PresenceChange::Unchanged,
            Some(last) if last.details == next.details => PresenceChange::State,
            _ => PresenceChange::Details,
        }
    }
}

/// Sink that logs payloads.
///
/// A new first line is logged at info, a changed second line at debug and
/// a repeated payload at trace.
#[derive(Debug, Default)]
pub struct TracingSink {
    last: Mutex<Option<PresencePayload>>,
}

impl TracingSink {
    /// Create a new tracing sink.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceSink for TracingSink {
    async fn connect(&self) -> DaemonResult<()> {
        info!("Presence sink ready");
        Ok(())
    }

    async fn set_activity(&self, payload: &PresencePayload) -> DaemonResult<()> {
        let mut last = self
            .last
            .lock()
            .map_err(|_| DaemonError::Presence("sink state poisoned".to_string()))?;

        match PresenceChange::between(last.as_ref(), payload) {
            PresenceChange::Unchanged => {
                trace!(details = %payload.details, "Presence unchanged");
                return Ok(());
            }
            PresenceChange::State => {
                debug!(state = %payload.state, "Presence state updated");
            }
            PresenceChange::Details => {
                let json = serde_json::to_string(payload).map_err(|e| {
                    DaemonError::Presence(format!("Failed to encode payload: {}", e))
                })?;
                info!(
                    details = %payload.details,
                    state = %payload.state,
                    payload = %json,
                    "Presence updated"
                );
            }
        }

        *last = Some(payload.clone());
        Ok(())
    }

    async fn clear(&self) -> DaemonResult<()> {
        info!("Presence cleared");
        if let Ok(mut last) = self.last.lock() {
            *last = None;
        }
        Ok(())
    }
}

// =============================================================================
// Presence Ticker
// =============================================================================

/// Formats the store contents into presence payloads on a fixed period.
pub struct PresenceTicker {
    /// Snapshot source (read-only)
    store: Arc<SnapshotStore>,
    /// Payload destination
    sink: Arc<dyn PresenceSink>,
    /// Configuration
    config: PresenceConfig,
    /// Start of the presence session, fixed for the ticker's lifetime
    start_timestamp: DateTime<Utc>,
    /// Shutdown token
    shutdown_token: CancellationToken,
}

impl PresenceTicker {
    /// Create a new presence ticker.
    pub fn new(
        store: Arc<SnapshotStore>,
        sink: Arc<dyn PresenceSink>,
        config: PresenceConfig,
        start_timestamp: DateTime<Utc>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            sink,
            config,
            start_timestamp,
            shutdown_token,
        }
    }

    /// Run one tick at `now`.
    ///
    /// Returns the payload handed to the sink, or `None` when there was
    /// nothing to present (no snapshot yet, or no selected device).
    pub async fn tick(&self, now: DateTime<Utc>) -> Option<PresencePayload> {
        let entry = self.store.read()?;

        let payload = format_presence(
            entry.snapshot(),
            entry.selected(),
            now,
            self.start_timestamp,
            &self.config.assets,
        )?;

        if let Err(e) = self.sink.set_activity(&payload).await {
            warn!(error = %e, "Failed to update presence");
        }

        Some(payload)
    }

    /// Start the ticker in the background.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(&self) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            start = %self.start_timestamp,
            "Presence ticker started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick(Utc::now()).await;
                }
            }
        }

        info!("Presence ticker stopped");
    }

    /// Stop the ticker.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }
}

// =============================================================================
// Tests
// =============================================================================
