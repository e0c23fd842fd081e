//! Throughput and outcome counters for the worker pool.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the dispatch loop, readable from the bridge handle.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// Requests accepted into the queue
    submitted: AtomicU64,
    /// Requests completed successfully
    completed: AtomicU64,
    /// Requests that ended in a terminal error
    failed: AtomicU64,
    /// Responses discarded because the caller abandoned the wait
    abandoned: AtomicU64,
    /// Bytes sent to the backend
    bytes_uploaded: AtomicU64,
    /// Bytes received from the backend
    bytes_downloaded: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_upload(&self, bytes: u64) {
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_download(&self, bytes: u64) {
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`BridgeMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub abandoned: u64,
    pub bytes_uploaded: u64,
    pub bytes_downloaded: u64,
}
