// Bridge metrics
//
// Lightweight counters describing traffic through the event bridge

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by the producer and consumer sides of an
/// [`EventBridge`](crate::bridge::EventBridge).
///
/// Uses relaxed atomics; the counters are diagnostic and never drive behaviour.
#[derive(Debug)]
pub struct BridgeMetrics {
    /// Events appended to the queue
    pub events_enqueued: AtomicU64,

    /// Events handed to a callback sink
    pub events_dispatched: AtomicU64,

    /// Events drained for a dialog with no registered sink
    pub events_undeliverable: AtomicU64,

    /// Events enqueued while no wake primitive was alive
    pub late_enqueues: AtomicU64,

    /// Wake signals sent by producers
    pub wake_signals: AtomicU64,

    /// Drain passes that found at least one event
    pub drains: AtomicU64,

    /// Modal sessions opened on the bridge
    pub sessions_opened: AtomicU64,

    start_time: Instant,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self {
            events_enqueued: AtomicU64::new(0),
            events_dispatched: AtomicU64::new(0),
            events_undeliverable: AtomicU64::new(0),
            late_enqueues: AtomicU64::new(0),
            wake_signals: AtomicU64::new(0),
            drains: AtomicU64::new(0),
            sessions_opened: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_enqueue(&self) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_undeliverable(&self) {
        self.events_undeliverable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_late_enqueue(&self) {
        self.late_enqueues.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wake(&self) {
        self.wake_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drain(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Events enqueued but not yet drained
    pub fn in_flight(&self) -> u64 {
        let enqueued = self.events_enqueued.load(Ordering::Relaxed);
        let drained = self.events_dispatched.load(Ordering::Relaxed)
            + self.events_undeliverable.load(Ordering::Relaxed);
        enqueued.saturating_sub(drained)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average number of events handled per drain pass
    pub fn avg_batch_size(&self) -> f64 {
        let drains = self.drains.load(Ordering::Relaxed);
        if drains > 0 {
            self.events_dispatched.load(Ordering::Relaxed) as f64 / drains as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Event Bridge Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Sessions: {}, wake signals: {}, drains: {} (avg batch {:.2})",
            self.sessions_opened.load(Ordering::Relaxed),
            self.wake_signals.load(Ordering::Relaxed),
            self.drains.load(Ordering::Relaxed),
            self.avg_batch_size()
        );
        tracing::info!(
            "Events: {} enqueued, {} dispatched, {} undeliverable, {} late, {} in flight",
            self.events_enqueued.load(Ordering::Relaxed),
            self.events_dispatched.load(Ordering::Relaxed),
            self.events_undeliverable.load(Ordering::Relaxed),
            self.late_enqueues.load(Ordering::Relaxed),
            self.in_flight()
        );
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
