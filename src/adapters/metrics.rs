use crate::domain::ports::MetricsRecorder;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub origin_successes: HashMap<String, u64>,
    pub origin_errors: HashMap<String, u64>,
}

/// 行程內計數器，注入解析鏈取代全域指標
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    origin_successes: Mutex<HashMap<String, u64>>,
    origin_errors: Mutex<HashMap<String, u64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
            origin_successes: Self::copy_counts(&self.origin_successes),
            origin_errors: Self::copy_counts(&self.origin_errors),
        }
    }

    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            "📊 Cache - hits: {}, misses: {}, errors: {}",
            snapshot.cache_hits,
            snapshot.cache_misses,
            snapshot.cache_errors
        );
        for (origin, count) in &snapshot.origin_successes {
            tracing::info!("📊 Origin {} - successes: {}", origin, count);
        }
        for (origin, count) in &snapshot.origin_errors {
            tracing::info!("📊 Origin {} - errors: {}", origin, count);
        }
    }

    fn increment(counts: &Mutex<HashMap<String, u64>>, origin: &str) {
        // 計數器被毒化時仍繼續累加
        let mut counts = counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *counts.entry(origin.to_string()).or_insert(0) += 1;
    }

    fn copy_counts(counts: &Mutex<HashMap<String, u64>>) -> HashMap<String, u64> {
        counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl MetricsRecorder for InMemoryMetrics {
    fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cache_error(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_origin_success(&self, origin: &str) {
        Self::increment(&self.origin_successes, origin);
    }

    fn record_origin_error(&self, origin: &str) {
        Self::increment(&self.origin_errors, origin);
    }
}
