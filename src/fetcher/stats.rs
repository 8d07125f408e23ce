//! Running outcome counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters mutated only by the orchestrator.
#[derive(Debug, Default)]
pub(crate) struct FetchStats {
    requests: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    blocked: AtomicU64,
}

impl FetchStats {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Logical fetch calls (not attempts).
    pub requests: u64,
    /// Fetches that returned HTTP 200.
    pub success: u64,
    /// Fetches that exhausted the retry budget.
    pub failed: u64,
    /// Individual retried attempts across all fetches.
    pub retried: u64,
    /// Policy denials plus HTTP 403 responses.
    pub blocked: u64,
}

impl StatsSnapshot {
    /// Fraction of fetch calls that succeeded, in [0, 1].
    pub fn success_rate(&self) -> f64 {
        self.success as f64 / self.requests.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = FetchStats::default();
        stats.record_request();
        stats.record_request();
        stats.record_success();
        stats.record_retried();
        stats.record_failed();
        stats.record_blocked();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.success, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.retried, 1);
        assert_eq!(snapshot.blocked, 1);
    }

    #[test]
    fn test_success_rate() {
        let stats = FetchStats::default();
        assert_eq!(stats.snapshot().success_rate(), 0.0);

        stats.record_request();
        stats.record_request();
        stats.record_success();
        assert_eq!(stats.snapshot().success_rate(), 0.5);
    }
}
