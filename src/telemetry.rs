//! Metrics tracking.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    pub list_requests: AtomicU64,
    pub exports: AtomicU64,
    pub exports_truncated: AtomicU64,
    pub store_failures: AtomicU64,
    pub query_timeouts: AtomicU64,
    pub dropped_filters: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_list(&self) {
        self.list_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_export(&self, truncated: bool) {
        self.exports.fetch_add(1, Ordering::Relaxed);
        if truncated {
            self.exports_truncated.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.query_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_filters(&self, n: usize) {
        self.dropped_filters.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            list_requests: self.list_requests.load(Ordering::Relaxed),
            exports: self.exports.load(Ordering::Relaxed),
            exports_truncated: self.exports_truncated.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            query_timeouts: self.query_timeouts.load(Ordering::Relaxed),
            dropped_filters: self.dropped_filters.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub list_requests: u64,
    pub exports: u64,
    pub exports_truncated: u64,
    pub store_failures: u64,
    pub query_timeouts: u64,
    pub dropped_filters: u64,
}
