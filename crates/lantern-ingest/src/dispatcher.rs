//! Batch dispatcher: drains the queue into size-capped batches and sends
//! them concurrently through the transport.

use std::sync::Arc;

use futures::future::join_all;
use lantern_core::IngestionEvent;

use crate::queue::EventQueue;
use crate::transport::IngestionTransport;

/// Drains the [`EventQueue`] and pushes batches through an
/// [`IngestionTransport`].
///
/// Delivery failures are terminal: the dispatcher logs them and records the
/// loss on the queue counters, but never surfaces an error to callers. One
/// bad batch must not take down the application being observed.
pub struct BatchDispatcher {
    queue: Arc<EventQueue>,
    transport: Arc<dyn IngestionTransport>,
    max_batch_size: usize,
}

impl BatchDispatcher {
    pub fn new(
        queue: Arc<EventQueue>,
        transport: Arc<dyn IngestionTransport>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            queue,
            transport,
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Sends every event currently in the queue.
    ///
    /// Only events present when the drain starts are covered; anything
    /// enqueued mid-flight stays queued for the next cycle. Batches are
    /// capped at `max_batch_size` and sent concurrently.
    pub async fn drain_and_send(&self) {
        let pending = self.queue.len();
        if pending == 0 {
            return;
        }

        let mut batches: Vec<Vec<IngestionEvent>> = Vec::new();
        let mut remaining = pending;
        while remaining > 0 {
            let batch = self.queue.pop_batch(self.max_batch_size.min(remaining));
            if batch.is_empty() {
                break;
            }
            remaining -= batch.len();
            batches.push(batch);
        }

        tracing::debug!(
            "flushing {} events in {} batches",
            pending - remaining,
            batches.len()
        );

        join_all(batches.into_iter().map(|batch| self.send_batch(batch))).await;
    }

    async fn send_batch(&self, batch: Vec<IngestionEvent>) {
        let count = batch.len();
        match self.transport.send_batch(&batch).await {
            Ok(response) => {
                for item in &response.errors {
                    tracing::warn!(
                        "ingestion rejected event {} (status {}): {}",
                        item.id,
                        item.status,
                        item.message.as_deref().unwrap_or("no message")
                    );
                }
                let failed = response.errors.len() as u64;
                self.queue.record_failed(failed);
                self.queue
                    .record_delivered((count as u64).saturating_sub(failed));
            }
            Err(e) => {
                tracing::error!("batch send failed, {} events lost: {}", count, e);
                self.queue.record_failed(count as u64);
            }
        }
    }
}
