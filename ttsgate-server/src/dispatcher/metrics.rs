//! Per-model dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for one model's dispatch path
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Tasks accepted (queued or run directly)
    pub submitted: AtomicU64,

    /// Tasks currently waiting for a worker
    pub queued: AtomicU64,

    /// Tasks currently running on a blocking thread
    pub running: AtomicU64,

    /// Tasks whose engine call succeeded
    pub completed: AtomicU64,

    /// Tasks whose engine call failed or panicked
    pub failed: AtomicU64,

    /// Tasks refused because the model was at capacity
    pub rejected: AtomicU64,

    /// Deepest queue observed
    pub max_queue_depth: AtomicU64,

    pub total_queue_wait_ms: AtomicU64,
    pub total_processing_ms: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A task entered the queue; returns the new depth
    pub fn record_queued(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let queued = self.queued.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_queue_depth.fetch_max(queued, Ordering::Relaxed);
        queued
    }

    /// Undo [`record_queued`](Self::record_queued) for a task that never made it in
    pub fn cancel_queued(&self) {
        self.submitted.fetch_sub(1, Ordering::Relaxed);
        self.queued.fetch_sub(1, Ordering::Relaxed);
    }

    /// A task bypassed the queue (direct mode)
    pub fn record_direct(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.running.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A worker picked a task up; returns the new queue depth
    pub fn record_started(&self, wait: Duration) -> u64 {
        let queued = self
            .queued
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1);
        self.running.fetch_add(1, Ordering::Relaxed);
        self.total_queue_wait_ms
            .fetch_add(wait.as_millis() as u64, Ordering::Relaxed);
        queued
    }

    /// A running task finished, either way
    pub fn record_finished(&self, processing: Duration, success: bool) {
        self.running.fetch_sub(1, Ordering::Relaxed);
        if success {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_processing_ms
            .fetch_add(processing.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn queue_depth(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn running_count(&self) -> u64 {
        self.running.load(Ordering::Relaxed)
    }

    fn finished(&self) -> u64 {
        self.completed.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }

    /// Average queue wait in milliseconds over finished tasks
    pub fn avg_queue_wait_ms(&self) -> f64 {
        let finished = self.finished();
        if finished == 0 {
            return 0.0;
        }
        self.total_queue_wait_ms.load(Ordering::Relaxed) as f64 / finished as f64
    }

    /// Average engine time in milliseconds over finished tasks
    pub fn avg_processing_ms(&self) -> f64 {
        let finished = self.finished();
        if finished == 0 {
            return 0.0;
        }
        self.total_processing_ms.load(Ordering::Relaxed) as f64 / finished as f64
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            running: self.running.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            max_queue_depth: self.max_queue_depth.load(Ordering::Relaxed),
            avg_queue_wait_ms: self.avg_queue_wait_ms(),
            avg_processing_ms: self.avg_processing_ms(),
        }
    }
}

/// Snapshot of dispatch counters at a point in time
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchSnapshot {
    pub submitted: u64,
    pub queued: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub max_queue_depth: u64,
    pub avg_queue_wait_ms: f64,
    pub avg_processing_ms: f64,
}
