//! Bounded in-memory event buffer

use lantern_core::IngestionEvent;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the pipeline counters.
///
/// `dropped` counts capacity overflows, `failed` counts events lost to
/// transport errors or rejected by the endpoint. Hosts that want delivery
/// guarantees beyond "check the logs" can watch these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// FIFO buffer of pending ingestion events, bounded by `capacity`.
///
/// Enqueue order is send order at batch granularity. The mutex is only held
/// for short, await-free sections; a flush removes events in atomic chunks
/// via [`EventQueue::pop_batch`] so concurrent enqueues simply land behind
/// the drain point and wait for the next flush.
pub struct EventQueue {
    events: Mutex<VecDeque<IngestionEvent>>,
    capacity: usize,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity,
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Append an event at the tail.
    ///
    /// Returns `false` when the queue is at capacity: the event is dropped,
    /// the drop is logged and counted, and the caller is never failed.
    /// Queued events are never displaced by new arrivals.
    pub fn enqueue(&self, event: IngestionEvent) -> bool {
        {
            let mut events = self.events.lock().unwrap();
            if events.len() < self.capacity {
                events.push_back(event);
                self.enqueued.fetch_add(1, Ordering::Relaxed);
                return true;
            }
        }

        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            "event queue full ({} events), dropping {} event {}",
            self.capacity,
            event.event_type,
            event.id
        );
        false
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove up to `max` events from the head in one atomic step.
    pub fn pop_batch(&self, max: usize) -> Vec<IngestionEvent> {
        let mut events = self.events.lock().unwrap();
        let take = max.min(events.len());
        events.drain(..take).collect()
    }

    pub(crate) fn record_delivered(&self, count: u64) {
        self.delivered.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self, count: u64) {
        self.failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
