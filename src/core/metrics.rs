//! Logger metrics for observability
//!
//! Counters for emitted and filtered records, bytes handed to sinks, flushed
//! batches, and the number of times a caller had to wait on the pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use zlog_engine::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_emitted(12);
/// metrics.record_filtered();
///
/// assert_eq!(metrics.records_emitted(), 1);
/// assert_eq!(metrics.bytes_dispatched(), 12);
/// assert_eq!(metrics.records_filtered(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records rendered and handed to the dispatcher
    records_emitted: AtomicU64,

    /// Records rejected by the level threshold
    records_filtered: AtomicU64,

    /// Rendered bytes handed to the dispatcher
    bytes_dispatched: AtomicU64,

    /// Batches written to sinks by the flush thread
    batches_flushed: AtomicU64,

    /// Times a producer blocked waiting for a spare arena
    block_events: AtomicU64,

    /// Times a caller waited for a free record pool slot
    pool_waits: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            records_emitted: AtomicU64::new(0),
            records_filtered: AtomicU64::new(0),
            bytes_dispatched: AtomicU64::new(0),
            batches_flushed: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            pool_waits: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_emitted(&self) -> u64 {
        self.records_emitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_filtered(&self) -> u64 {
        self.records_filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bytes_dispatched(&self) -> u64 {
        self.bytes_dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_flushed(&self) -> u64 {
        self.batches_flushed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pool_waits(&self) -> u64 {
        self.pool_waits.load(Ordering::Relaxed)
    }

    /// Record one emitted record of `bytes` rendered bytes
    #[inline]
    pub fn record_emitted(&self, bytes: usize) -> u64 {
        self.bytes_dispatched
            .fetch_add(bytes as u64, Ordering::Relaxed);
        self.records_emitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.records_filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_batch(&self) -> u64 {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_pool_wait(&self) -> u64 {
        self.pool_waits.fetch_add(1, Ordering::Relaxed)
    }

    /// Percentage of calls rejected by the threshold (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been logged.
    pub fn filter_rate(&self) -> f64 {
        let filtered = self.records_filtered() as f64;
        let total = self.records_emitted() as f64 + filtered;
        if total == 0.0 {
            0.0
        } else {
            (filtered / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.records_emitted.store(0, Ordering::Relaxed);
        self.records_filtered.store(0, Ordering::Relaxed);
        self.bytes_dispatched.store(0, Ordering::Relaxed);
        self.batches_flushed.store(0, Ordering::Relaxed);
        self.block_events.store(0, Ordering::Relaxed);
        self.pool_waits.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            records_emitted: AtomicU64::new(self.records_emitted()),
            records_filtered: AtomicU64::new(self.records_filtered()),
            bytes_dispatched: AtomicU64::new(self.bytes_dispatched()),
            batches_flushed: AtomicU64::new(self.batches_flushed()),
            block_events: AtomicU64::new(self.block_events()),
            pool_waits: AtomicU64::new(self.pool_waits()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.records_emitted(), 0);
        assert_eq!(metrics.records_filtered(), 0);
        assert_eq!(metrics.bytes_dispatched(), 0);
        assert_eq!(metrics.batches_flushed(), 0);
        assert_eq!(metrics.block_events(), 0);
        assert_eq!(metrics.pool_waits(), 0);
    }

    #[test]
    fn test_record_emitted_counts_bytes() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.record_emitted(10), 0); // Returns previous value
        metrics.record_emitted(5);
        assert_eq!(metrics.records_emitted(), 2);
        assert_eq!(metrics.bytes_dispatched(), 15);
    }

    #[test]
    fn test_filter_rate() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.filter_rate(), 0.0);

        for _ in 0..3 {
            metrics.record_emitted(1);
        }
        metrics.record_filtered();
        assert_eq!(metrics.filter_rate(), 25.0);
    }

    #[test]
    fn test_reset_and_snapshot() {
        let metrics = LoggerMetrics::new();
        metrics.record_block();
        metrics.record_batch();

        let snapshot = metrics.clone();
        metrics.reset();

        assert_eq!(metrics.block_events(), 0);
        assert_eq!(metrics.batches_flushed(), 0);
        assert_eq!(snapshot.block_events(), 1);
        assert_eq!(snapshot.batches_flushed(), 1);
    }
}
