//! Rig source port.
//!
//! The poller depends on this trait rather than on the concrete REST
//! client, so the refresh pipeline can run against scripted results.
//!
//! Implementations:
//! - `NicehashClient` - signed requests against the real API
//! - `StubRigSource` - scripted results for tests

use async_trait::async_trait;
use rigwatch_domain::RigsSnapshot;

use crate::error::RigApiError;

/// Port for fetching the account's rigs snapshot.
#[async_trait]
pub trait RigSource: Send + Sync {
    /// Fetch a fresh snapshot.
    ///
    /// # Errors
    ///
    /// - `Network`/`Timeout`/`Http` for transport-class failures
    /// - `Auth` when the API rejects the signature
    /// - `Decode` when the body does not match the snapshot shape
    async fn fetch_rigs(&self) -> Result<RigsSnapshot, RigApiError>;
}
