use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::Outcome;

/// Point-in-time copy of the shared counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub success_count: u64,
    pub fail_count: u64,
    /// Subset of `fail_count` caused by transport faults
    pub transport_faults: u64,
    /// Connections replaced after a fault, across all workers
    pub reconnects: u64,
}

impl Counts {
    /// Completed attempts, successful or not
    pub fn attempts(&self) -> u64 {
        self.success_count + self.fail_count
    }

    pub fn http_failures(&self) -> u64 {
        self.fail_count - self.transport_faults
    }
}

/// Result counters shared by every worker.
///
/// All counts live behind one lock so that `success_count + fail_count`
/// always equals the number of recorded attempts.
#[derive(Debug, Default)]
pub struct SharedCounters {
    inner: Mutex<Counts>,
}

impl SharedCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &Outcome) {
        let mut counts = self.inner.lock();
        match outcome {
            Outcome::Success(_) => counts.success_count += 1,
            Outcome::HttpFailure(_) => counts.fail_count += 1,
            Outcome::TransportFault(_) => {
                counts.fail_count += 1;
                counts.transport_faults += 1;
            }
        }
    }

    /// Kept here rather than in each worker's summary so that workers aborted
    /// after the grace period are still accounted for.
    pub fn record_reconnect(&self) {
        self.inner.lock().reconnects += 1;
    }

    pub fn snapshot(&self) -> Counts {
        *self.inner.lock()
    }
}

/// Run state: starts true, flips to false exactly once.
#[derive(Debug)]
pub struct RunFlag(AtomicBool);

impl RunFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}
