//! Poller: periodic rig refresh.
//!
//! The Poller is a background service that:
//! - Fetches the rigs snapshot on a fixed period
//! - Selects the device of interest from the fresh snapshot
//! - Swaps snapshot and device into the store together
//!
//! A failed cycle never touches the store, so readers keep getting the
//! last good pairing. Fetches are awaited inline, so there is never more
//! than one in flight; ticks that fire during a slow fetch are skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use rigwatch_connectors::{RigApiError, RigSource};
use rigwatch_domain::{select_device, DeviceBrand};
use rigwatch_store::SnapshotStore;

// =============================================================================
// Configuration
// =============================================================================

/// Poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Refresh period
    pub interval: Duration,
    /// Upper bound on the wait between attempts while failing
    pub max_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_backoff: Duration::from_secs(900),
        }
    }
}

impl PollerConfig {
    /// Most ticks the backoff may skip in a row.
    fn max_skipped_ticks(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        let ticks = self.max_backoff.as_millis() / interval;
        u32::try_from(ticks).unwrap_or(u32::MAX).saturating_sub(1)
    }
}

// =============================================================================
// Backoff
// =============================================================================

/// Capped exponential backoff counted in skipped ticks.
///
/// After the n-th consecutive failure, `2^(n-1) - 1` ticks are skipped
/// (0, 1, 3, 7, ...) up to `max_skip`.
#[derive(Debug, Clone)]
pub struct Backoff {
    consecutive_failures: u32,
    skip_remaining: u32,
    max_skip: u32,
}

impl Backoff {
    /// Create a backoff that never skips more than `max_skip` ticks.
    pub fn new(max_skip: u32) -> Self {
        Self {
            consecutive_failures: 0,
            skip_remaining: 0,
            max_skip,
        }
    }

    /// Record a failed cycle. Returns how many ticks will be skipped.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let exponent = self.consecutive_failures - 1;
        let skip = 1u32
            .checked_shl(exponent)
            .unwrap_or(u32::MAX)
            .saturating_sub(1)
            .min(self.max_skip);
        self.skip_remaining = skip;
        skip
    }

    /// Record a successful cycle.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.skip_remaining = 0;
    }

    /// Consume one tick of backoff. Returns true if this tick should be skipped.
    pub fn should_skip(&mut self) -> bool {
        if self.skip_remaining > 0 {
            self.skip_remaining -= 1;
            true
        } else {
            false
        }
    }

    /// Failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

// =============================================================================
// Poller
// =============================================================================

/// Result of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Rigs in the fresh snapshot
    pub rigs: usize,
    /// Id of the selected device, if one qualified
    pub selected_device: Option<String>,
}

/// Periodically refreshes the snapshot store.
pub struct Poller {
    /// Where snapshots come from
    source: Arc<dyn RigSource>,
    /// Where snapshots go
    store: Arc<SnapshotStore>,
    /// Preferred device brand
    brand: DeviceBrand,
    /// Configuration
    config: PollerConfig,
    /// Shutdown token
    shutdown_token: CancellationToken,
}

impl Poller {
    /// Create a new poller.
    pub fn new(
        source: Arc<dyn RigSource>,
        store: Arc<SnapshotStore>,
        brand: DeviceBrand,
        config: PollerConfig,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            source,
            store,
            brand,
            config,
            shutdown_token,
        }
    }

    /// Run one cycle: fetch, select, replace.
    ///
    /// On error the store is left untouched.
    pub async fn poll_once(&self) -> Result<PollOutcome, RigApiError> {
        let snapshot = self.source.fetch_rigs().await?;
        let selected = select_device(&snapshot, self.brand);

        let outcome = PollOutcome {
            rigs: snapshot.mining_rigs.len(),
            selected_device: selected.as_ref().map(|d| d.id.clone()),
        };

        self.store.replace(snapshot, selected);
        Ok(outcome)
    }

    /// Start the poller in the background.
    ///
    /// Returns a JoinHandle that completes once the shutdown token fires.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(&self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            brand = %self.brand,
            "Poller started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut backoff = Backoff::new(self.config.max_skipped_ticks());
        let mut last_selected: Option<String> = None;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if backoff.should_skip() {
                debug!(
                    failures = backoff.consecutive_failures(),
                    "Backing off, skipping poll"
                );
                continue;
            }

            let result = tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                result = self.poll_once() => result,
            };

            match result {
                Ok(outcome) => {
                    if backoff.consecutive_failures() > 0 {
                        info!(
                            failures = backoff.consecutive_failures(),
                            "Rig fetch recovered"
                        );
                    }
                    backoff.record_success();
                    self.log_selection(&outcome, &mut last_selected);
                }
                Err(e) => {
                    let skip = backoff.record_failure();
                    self.log_failure(&e, backoff.consecutive_failures(), skip);
                }
            }
        }

        info!("Poller stopped");
    }

    fn log_selection(&self, outcome: &PollOutcome, last_selected: &mut Option<String>) {
        debug!(rigs = outcome.rigs, "Rigs refreshed");

        if outcome.selected_device == *last_selected {
            return;
        }

        match &outcome.selected_device {
            Some(device_id) => info!(%device_id, brand = %self.brand, "Selected device"),
            None => warn!(brand = %self.brand, rigs = outcome.rigs, "No qualifying device"),
        }
        *last_selected = outcome.selected_device.clone();
    }

    fn log_failure(&self, err: &RigApiError, failures: u32, skipped_ticks: u32) {
        let stale_secs = self
            .store
            .read()
            .map(|entry| entry.age(Utc::now()).num_seconds());

        if err.is_auth() || matches!(err, RigApiError::Signature(_)) {
            error!(
                error = %err,
                failures,
                skipped_ticks,
                "Rig API rejected the request; check RIGWATCH_API_KEY, RIGWATCH_API_SECRET and RIGWATCH_ORG_ID"
            );
        } else if err.is_transient() {
            warn!(
                error = %err,
                failures,
                skipped_ticks,
                ?stale_secs,
                "Rig fetch failed, keeping previous snapshot"
            );
        } else {
            warn!(
                error = %err,
                failures,
                skipped_ticks,
                ?stale_secs,
                "Malformed rigs response, keeping previous snapshot"
            );
        }
    }

    /// Stop the poller.
    pub fn shutdown(&self) {
        info!("Shutting down poller");
        self.shutdown_token.cancel();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rigwatch_connectors::StubRigSource;
    use rigwatch_domain::RigsSnapshot;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source whose fetches take longer than the poll interval.
    struct SlowSource {
        delay: Duration,
        snapshot: RigsSnapshot,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl RigSource for SlowSource {
        async fn fetch_rigs(&self) -> Result<RigsSnapshot, RigApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(self.snapshot.clone())
        }
    }

    fn snapshot(marker: &str, brand: &str, status: &str) -> RigsSnapshot {
        serde_json::from_value(json!({
            "unpaidAmount": marker,
            "nextPayoutTimestamp": "0",
            "miningRigs": [{
                "rigId": "rig-1",
                "devices": [{
                    "id": format!("{}-gpu", marker),
                    "name": "gpu",
                    "deviceType": { "enumName": brand, "description": brand },
                    "status": { "enumName": status, "description": status }
                }]
            }]
        }))
        .unwrap()
    }

    fn poller(source: Arc<StubRigSource>, store: Arc<SnapshotStore>) -> Poller {
        Poller::new(
            source,
            store,
            DeviceBrand::Nvidia,
            PollerConfig::default(),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_backoff_sequence() {
        let mut backoff = Backoff::new(15);

        assert_eq!(backoff.record_failure(), 0);
        assert_eq!(backoff.record_failure(), 1);
        assert_eq!(backoff.record_failure(), 3);
        assert_eq!(backoff.record_failure(), 7);
        assert_eq!(backoff.record_failure(), 15);
        assert_eq!(backoff.record_failure(), 15);
        assert_eq!(backoff.consecutive_failures(), 6);
    }

    #[test]
    fn test_backoff_skip_and_reset() {
        let mut backoff = Backoff::new(15);
        backoff.record_failure();
        backoff.record_failure();

        assert!(backoff.should_skip());
        assert!(!backoff.should_skip());

        backoff.record_failure();
        backoff.record_success();
        assert!(!backoff.should_skip());
        assert_eq!(backoff.consecutive_failures(), 0);
    }

    #[test]
    fn test_backoff_survives_many_failures() {
        let mut backoff = Backoff::new(15);
        for _ in 0..100 {
            backoff.record_failure();
        }
        assert_eq!(backoff.record_failure(), 15);
    }

    #[test]
    fn test_max_skipped_ticks() {
        let config = PollerConfig::default();
        assert_eq!(config.max_skipped_ticks(), 14);

        let config = PollerConfig {
            interval: Duration::from_secs(60),
            max_backoff: Duration::from_secs(60),
        };
        assert_eq!(config.max_skipped_ticks(), 0);
    }

    #[tokio::test]
    async fn test_poll_once_replaces_store() {
        let source = Arc::new(StubRigSource::new(snapshot("a", "NVIDIA", "MINING")));
        let store = Arc::new(SnapshotStore::new());

        let outcome = poller(source, store.clone()).poll_once().await.unwrap();

        assert_eq!(outcome.rigs, 1);
        assert_eq!(outcome.selected_device.as_deref(), Some("a-gpu"));

        let entry = store.read().unwrap();
        assert_eq!(entry.snapshot().unpaid_amount, "a");
        assert_eq!(entry.selected().unwrap().id, "a-gpu");
    }

    #[tokio::test]
    async fn test_poll_once_stores_empty_selection() {
        let source = Arc::new(StubRigSource::new(snapshot("a", "AMD", "MINING")));
        let store = Arc::new(SnapshotStore::new());

        let outcome = poller(source, store.clone()).poll_once().await.unwrap();

        assert!(outcome.selected_device.is_none());
        let entry = store.read().unwrap();
        assert!(entry.selected().is_none());
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_previous_pair() {
        let source = Arc::new(StubRigSource::with_fallback(Err(RigApiError::Network(
            "connection reset".to_string(),
        ))));
        source.push(Ok(snapshot("a", "NVIDIA", "MINING")));
        let store = Arc::new(SnapshotStore::new());
        let poller = poller(source, store.clone());

        poller.poll_once().await.unwrap();
        let before = store.read().unwrap();

        assert!(poller.poll_once().await.is_err());
        let after = store.read().unwrap();

        assert_eq!(*before, *after);
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_failure_before_first_success_leaves_store_empty() {
        let source = Arc::new(StubRigSource::with_fallback(Err(RigApiError::Decode(
            "expected value".to_string(),
        ))));
        let store = Arc::new(SnapshotStore::new());

        assert!(poller(source, store.clone()).poll_once().await.is_err());
        assert!(store.read().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_on_interval_until_shutdown() {
        let source = Arc::new(StubRigSource::new(snapshot("a", "NVIDIA", "MINING")));
        let store = Arc::new(SnapshotStore::new());
        let poller = Arc::new(poller(source.clone(), store.clone()));

        let handle = poller.clone().start();

        // First tick fires immediately, then once per minute
        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(source.calls(), 3);
        assert!(store.read().is_some());

        poller.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_never_overlaps() {
        let source = Arc::new(SlowSource {
            delay: Duration::from_secs(150),
            snapshot: snapshot("a", "NVIDIA", "MINING"),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let store = Arc::new(SnapshotStore::new());
        let poller = Arc::new(Poller::new(
            source.clone(),
            store.clone(),
            DeviceBrand::Nvidia,
            PollerConfig::default(),
            CancellationToken::new(),
        ));

        let handle = poller.clone().start();

        // Each 150 s fetch swallows the ticks that fire while it runs
        tokio::time::sleep(Duration::from_secs(590)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(store.read().is_some());

        poller.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_polling_through_auth_failures() {
        let source = Arc::new(StubRigSource::new(snapshot("a", "NVIDIA", "MINING")));
        for _ in 0..3 {
            source.push(Err(RigApiError::Auth {
                status: 401,
                message: "Invalid signature".to_string(),
            }));
        }
        let store = Arc::new(SnapshotStore::new());
        let poller = Arc::new(poller(source.clone(), store.clone()));

        let handle = poller.clone().start();

        // Rejected at 0, 60 and 180 s
        tokio::time::sleep(Duration::from_secs(390)).await;
        assert_eq!(source.calls(), 3);
        assert!(store.read().is_none());

        // Accepted at 420 s, then once per minute
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls(), 8);
        assert_eq!(store.read().unwrap().selected().unwrap().id, "a-gpu");
        assert!(!handle.is_finished());

        poller.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_backs_off_on_repeated_failures() {
        let source = Arc::new(StubRigSource::with_fallback(Err(RigApiError::Timeout)));
        let store = Arc::new(SnapshotStore::new());
        let poller = Arc::new(poller(source.clone(), store));

        let handle = poller.clone().start();

        // Ticks at 0..=9 minutes: attempts at 0, 1, 3, 7; the rest are skipped
        tokio::time::sleep(Duration::from_secs(9 * 60 + 30)).await;
        assert_eq!(source.calls(), 4);

        poller.shutdown();
        handle.await.unwrap();
    }
}
