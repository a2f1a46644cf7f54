//! E2E test: poll cycles feed the presence ticker.
//!
//! Flow:
//! 1. Cycle A: fetch succeeds -> snapshot and selected device stored together
//! 2. Cycle B: fetch fails with a network error -> store unchanged
//! 3. Presence ticks keep formatting the last good pair
//! 4. Shutdown clears the sink and the store

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rigwatch_connectors::{RigApiError, StubRigSource};
use rigwatch_domain::{DeviceBrand, PresencePayload, RigsSnapshot};
use rigwatch_store::SnapshotStore;
use rigwatchd::{
    Config, Daemon, DaemonResult, Poller, PollerConfig, PresenceSink, PresenceTicker,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Sink that records everything it is asked to do.
#[derive(Default)]
struct RecordingSink {
    connected: Mutex<bool>,
    payloads: Mutex<Vec<PresencePayload>>,
    cleared: Mutex<u32>,
}

#[async_trait]
impl PresenceSink for RecordingSink {
    async fn connect(&self) -> DaemonResult<()> {
        *self.connected.lock().unwrap() = true;
        Ok(())
    }

    async fn set_activity(&self, payload: &PresencePayload) -> DaemonResult<()> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn clear(&self) -> DaemonResult<()> {
        *self.cleared.lock().unwrap() += 1;
        Ok(())
    }
}

fn now() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
}

fn rigs_response() -> RigsSnapshot {
    serde_json::from_value(json!({
        "totalRigs": 1,
        "totalDevices": 3,
        "unpaidAmount": "0.00054321",
        "nextPayoutTimestamp": (1_700_000_000_000i64 + 7_200_000).to_string(),
        "lastPayoutTimestamp": "2023-11-14T20:00:00Z",
        "miningRigs": [{
            "rigId": "rig-1",
            "name": "basement",
            "minerStatus": "MINING",
            "devices": [
                {
                    "id": "gpu-a",
                    "name": "GTX 1080",
                    "deviceType": { "enumName": "NVIDIA", "description": "Nvidia" },
                    "status": { "enumName": "DISABLED", "description": "Disabled" }
                },
                {
                    "id": "gpu-b",
                    "name": "RTX 3080",
                    "deviceType": { "enumName": "NVIDIA", "description": "Nvidia" },
                    "status": { "enumName": "MINING", "description": "Mining" },
                    "temperature": 63,
                    "load": 99,
                    "powerUsage": 220,
                    "speeds": [{
                        "algorithm": "DAGGERHASHIMOTO",
                        "title": "DaggerHashimoto",
                        "speed": "97.123",
                        "displaySuffix": "MH"
                    }],
                    "intensity": { "enumName": "HIGH", "description": "High power mode" }
                },
                {
                    "id": "gpu-c",
                    "name": "RTX 3060",
                    "deviceType": { "enumName": "NVIDIA", "description": "Nvidia" },
                    "status": { "enumName": "MINING", "description": "Mining" }
                }
            ]
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

#[tokio::test]
async fn test_network_error_keeps_last_good_pair() {
    let source = Arc::new(StubRigSource::with_fallback(Err(RigApiError::Network(
        "connection refused".to_string(),
    ))));
    source.push(Ok(rigs_response()));
    let store = Arc::new(SnapshotStore::new());
    let poller = poller(source.clone(), store.clone());

    // Cycle A
    let outcome = poller.poll_once().await.unwrap();
    assert_eq!(outcome.selected_device.as_deref(), Some("gpu-b"));
    let before = store.read().unwrap();

    // Cycle B
    let err = poller.poll_once().await.unwrap_err();
    assert!(err.is_transient());

    let after = store.read().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.selected().unwrap().name, "RTX 3080");
    assert_eq!(source.calls(), 2);

    // Presence still reflects cycle A
    let sink = Arc::new(RecordingSink::default());
    let ticker = PresenceTicker::new(
        store,
        sink.clone(),
        Config::test().presence,
        now(),
        CancellationToken::new(),
    );
    let payload = ticker.tick(now()).await.unwrap();

    assert_eq!(payload.details, "RTX 3080 (97.12 MH/s) 220W (High power mode)");
    assert_eq!(payload.state, "Next payout 02:00:00 / Unpaid: 0.00054321 BTC");
    assert_eq!(sink.payloads.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_daemon_lifecycle() {
    let source = Arc::new(StubRigSource::with_fallback(Err(RigApiError::Timeout)));
    source.push(Ok(rigs_response()));
    let sink = Arc::new(RecordingSink::default());

    let daemon = Daemon::new(Config::test(), source.clone(), sink.clone());
    let store = daemon.store();
    let running = daemon.start().await.unwrap();
    assert!(*sink.connected.lock().unwrap());

    // First poll succeeds, the one at 60s times out
    tokio::time::sleep(Duration::from_millis(90_500)).await;
    assert_eq!(source.calls(), 2);

    let entry = store.read().unwrap();
    assert_eq!(entry.selected().unwrap().id, "gpu-b");

    {
        let payloads = sink.payloads.lock().unwrap();
        assert!(payloads.len() >= 90);
        assert!(payloads
            .iter()
            .all(|p| p.start_timestamp == running.start_timestamp()));
        assert!(payloads.iter().all(|p| p.details.starts_with("RTX 3080")));
    }

    running.shutdown().await.unwrap();
    assert_eq!(*sink.cleared.lock().unwrap(), 1);
    assert!(store.read().is_none());
}
