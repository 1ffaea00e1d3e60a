//! Internal metrics collection.
//!
//! Collects counters and gauges in-memory for the health/metrics surface;
//! nothing here is flushed to an external store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the ingestion engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // C6 consumer metrics
    pub events_consumed: Counter,
    pub consumer_errors: Counter,
    pub batches_redelivered: Counter,

    // C7 envelope decode metrics
    pub envelopes_decoded: Counter,
    pub envelope_decode_errors: Counter,

    // C8/C9 billing encoder metrics
    pub billing_records_encoded: Counter,
    pub billing_schema_rejections: Counter,

    // C5 crypto pool metrics
    pub crypto_pool_wait_ms: Histogram,
    pub crypto_pool_acquire_timeouts: Counter,

    // C3 relational store metrics
    pub relational_bulk_inserts: Counter,
    pub relational_bulk_insert_errors: Counter,
    pub relational_row_fallback_inserts: Counter,

    // C2 object-store metrics
    pub objectstore_uploads: Counter,
    pub objectstore_upload_errors: Counter,
    pub superstore_allow_list_misses: Counter,

    // C4 search-index metrics
    pub index_upserts: Counter,
    pub index_upsert_errors: Counter,

    // C12 replay cache metrics
    pub replay_cache_hits: Counter,
    pub replay_cache_misses: Counter,
    pub replay_jobs_evicted: Counter,

    // Latency histograms
    pub handler_latency_ms: Histogram,
    pub relational_latency_ms: Histogram,
    pub objectstore_latency_ms: Histogram,
    pub index_latency_ms: Histogram,

    // Gauges
    pub active_connections: Gauge,
    pub queue_depth: Gauge,
    pub consumer_lag: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_consumed: u64,
    pub consumer_errors: u64,
    pub billing_records_encoded: u64,
    pub relational_bulk_inserts: u64,
    pub relational_bulk_insert_errors: u64,
    pub objectstore_uploads: u64,
    pub objectstore_upload_errors: u64,
    pub index_upserts: u64,
    pub index_upsert_errors: u64,
    pub handler_latency_mean_ms: f64,
    pub relational_latency_mean_ms: f64,
    pub objectstore_latency_mean_ms: f64,
    pub index_latency_mean_ms: f64,
    pub active_connections: u64,
    pub queue_depth: u64,
    pub consumer_lag: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_consumed: self.events_consumed.get(),
            consumer_errors: self.consumer_errors.get(),
            billing_records_encoded: self.billing_records_encoded.get(),
            relational_bulk_inserts: self.relational_bulk_inserts.get(),
            relational_bulk_insert_errors: self.relational_bulk_insert_errors.get(),
            objectstore_uploads: self.objectstore_uploads.get(),
            objectstore_upload_errors: self.objectstore_upload_errors.get(),
            index_upserts: self.index_upserts.get(),
            index_upsert_errors: self.index_upsert_errors.get(),
            handler_latency_mean_ms: self.handler_latency_ms.mean(),
            relational_latency_mean_ms: self.relational_latency_ms.mean(),
            objectstore_latency_mean_ms: self.objectstore_latency_ms.mean(),
            index_latency_mean_ms: self.index_latency_ms.mean(),
            active_connections: self.active_connections.get(),
            queue_depth: self.queue_depth.get(),
            consumer_lag: self.consumer_lag.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
