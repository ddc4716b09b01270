//! Global atomic counters for extraction observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations, no locking.
pub struct Metrics {
    documents_processed: AtomicU64,
    events_extracted: AtomicU64,
    anomalies_flagged: AtomicU64,
    augmentation_fallbacks: AtomicU64,
    placeholder_times: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            documents_processed: AtomicU64::new(0),
            events_extracted: AtomicU64::new(0),
            anomalies_flagged: AtomicU64::new(0),
            augmentation_fallbacks: AtomicU64::new(0),
            placeholder_times: AtomicU64::new(0),
        }
    }

    pub fn inc_documents_processed(&self) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "documents_processed", "counter incremented");
    }

    /// Add the events returned for one document.
    pub fn add_events_extracted(&self, n: u64) {
        self.events_extracted.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "events_extracted", by = n, "counter incremented");
    }

    /// Add the anomaly notes recorded for one document.
    pub fn add_anomalies_flagged(&self, n: u64) {
        self.anomalies_flagged.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "anomalies_flagged", by = n, "counter incremented");
    }

    pub fn inc_augmentation_fallbacks(&self) {
        self.augmentation_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "augmentation_fallbacks", "counter incremented");
    }

    /// A start time had to be taken from the placeholder table.
    pub fn inc_placeholder_times(&self) {
        self.placeholder_times.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "placeholder_times", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            documents_processed = self.documents_processed(),
            events_extracted = self.events_extracted(),
            anomalies_flagged = self.anomalies_flagged(),
            augmentation_fallbacks = self.augmentation_fallbacks(),
            placeholder_times = self.placeholder_times(),
        );
    }

    pub fn documents_processed(&self) -> u64 {
        self.documents_processed.load(Ordering::Relaxed)
    }

    pub fn events_extracted(&self) -> u64 {
        self.events_extracted.load(Ordering::Relaxed)
    }

    pub fn anomalies_flagged(&self) -> u64 {
        self.anomalies_flagged.load(Ordering::Relaxed)
    }

    pub fn augmentation_fallbacks(&self) -> u64 {
        self.augmentation_fallbacks.load(Ordering::Relaxed)
    }

    pub fn placeholder_times(&self) -> u64 {
        self.placeholder_times.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.documents_processed.store(0, Ordering::Relaxed);
        self.events_extracted.store(0, Ordering::Relaxed);
        self.anomalies_flagged.store(0, Ordering::Relaxed);
        self.augmentation_fallbacks.store(0, Ordering::Relaxed);
        self.placeholder_times.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.documents_processed(), 0);
        m.inc_documents_processed();
        m.inc_documents_processed();
        assert_eq!(m.documents_processed(), 2);

        m.add_events_extracted(7);
        m.add_events_extracted(3);
        assert_eq!(m.events_extracted(), 10);

        m.add_anomalies_flagged(2);
        assert_eq!(m.anomalies_flagged(), 2);

        m.inc_augmentation_fallbacks();
        assert_eq!(m.augmentation_fallbacks(), 1);

        m.inc_placeholder_times();
        assert_eq!(m.placeholder_times(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_documents_processed();
        m.add_events_extracted(4);
        m.add_anomalies_flagged(1);
        m.inc_augmentation_fallbacks();
        m.inc_placeholder_times();
        m.reset();
        assert_eq!(m.documents_processed(), 0);
        assert_eq!(m.events_extracted(), 0);
        assert_eq!(m.anomalies_flagged(), 0);
        assert_eq!(m.augmentation_fallbacks(), 0);
        assert_eq!(m.placeholder_times(), 0);
    }
}
