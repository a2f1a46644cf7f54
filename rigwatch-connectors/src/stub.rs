//! Stub implementations for testing.
//!
//! These implementations simulate the rig API without making real calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rigwatch_domain::RigsSnapshot;

use crate::error::RigApiError;
use crate::ports::RigSource;

// =============================================================================
// Stub Rig Source
// =============================================================================

/// Stub rig source for testing.
///
/// Returns scripted results in order. Once the script runs out, every
/// further call returns the fallback result.
pub struct StubRigSource {
    /// Results still to hand out
    script: Mutex<VecDeque<Result<RigsSnapshot, RigApiError>>>,
    /// Returned when the script is exhausted
    fallback: Result<RigsSnapshot, RigApiError>,
    /// Number of fetches performed
    calls: AtomicUsize,
}

impl StubRigSource {
    /// Create a stub that always returns `snapshot`.
    pub fn new(snapshot: RigsSnapshot) -> Self {
        Self::with_fallback(Ok(snapshot))
    }

    /// Create a stub with an explicit fallback result.
    pub fn with_fallback(fallback: Result<RigsSnapshot, RigApiError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a result for an upcoming fetch.
    pub fn push(&self, result: Result<RigsSnapshot, RigApiError>) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(result);
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RigSource for StubRigSource {
    async fn fetch_rigs(&self) -> Result<RigsSnapshot, RigApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
