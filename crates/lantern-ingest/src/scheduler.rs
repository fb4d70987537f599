//! Flush scheduling: size trigger, interval timer, single-flight
//! coalescing, and deterministic shutdown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::BatchDispatcher;
use crate::queue::EventQueue;

type SharedFlush = Shared<BoxFuture<'static, ()>>;

/// Decides when the queue gets drained.
///
/// Three things start a flush: the queue reaching `flush_at` events, the
/// interval timer firing while sub-threshold events sit queued, and explicit
/// [`flush`](FlushScheduler::flush) / [`shutdown`](FlushScheduler::shutdown)
/// calls. At most one flush runs at a time; every trigger that lands while
/// one is in flight joins it instead of starting another.
pub struct FlushScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    queue: Arc<EventQueue>,
    dispatcher: BatchDispatcher,
    flush_at: usize,
    flush_interval: Duration,
    active_flush: Mutex<Option<SharedFlush>>,
    timer: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl FlushScheduler {
    pub fn new(
        queue: Arc<EventQueue>,
        dispatcher: BatchDispatcher,
        flush_at: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                queue,
                dispatcher,
                flush_at: flush_at.max(1),
                flush_interval,
                active_flush: Mutex::new(None),
                timer: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Notifies the scheduler that an event was enqueued.
    ///
    /// Cheap and synchronous; any flush it causes runs on a background task.
    pub fn on_event(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        if self.inner.queue.len() >= self.inner.flush_at {
            Self::spark(&self.inner);
        } else {
            Self::arm_timer(&self.inner);
        }
    }

    /// Flushes now, or joins the flush already in flight.
    ///
    /// Resolves once that flush has attempted delivery of its snapshot. An
    /// in-flight flush only covers events present when it started; anything
    /// newer is picked up by the follow-up flush it schedules on completion.
    pub async fn flush(&self) {
        Self::obtain(&self.inner).await;
    }

    /// Drains the queue completely and stops the timer.
    ///
    /// Loops flushes until the queue is observed empty, so events enqueued
    /// while the final flushes run are still delivered. After this resolves
    /// the scheduler ignores `on_event`.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        Self::cancel_timer(&self.inner);
        loop {
            Self::obtain(&self.inner).await;
            if self.inner.queue.is_empty() {
                break;
            }
        }
        tracing::debug!("flush scheduler shut down, queue drained");
    }

    /// Returns the in-flight flush, creating and spawning one if none is
    /// running.
    fn obtain(inner: &Arc<SchedulerInner>) -> SharedFlush {
        let mut slot = inner.active_flush.lock().unwrap();
        if let Some(flush) = slot.as_ref() {
            return flush.clone();
        }
        let flush = Self::make_flush(inner.clone());
        *slot = Some(flush.clone());
        // Drive it even when every trigger is fire-and-forget.
        tokio::spawn(flush.clone());
        flush
    }

    fn make_flush(inner: Arc<SchedulerInner>) -> SharedFlush {
        async move {
            Self::cancel_timer(&inner);
            inner.dispatcher.drain_and_send().await;
            *inner.active_flush.lock().unwrap() = None;
            Self::after_flush(&inner);
        }
        .boxed()
        .shared()
    }

    /// Re-triggers for events that arrived while the flush ran.
    fn after_flush(inner: &Arc<SchedulerInner>) {
        if inner.shutdown.is_cancelled() {
            return;
        }
        let len = inner.queue.len();
        if len >= inner.flush_at {
            Self::spark(inner);
        } else if len > 0 {
            Self::arm_timer(inner);
        }
    }

    /// Starts a flush without waiting for it.
    fn spark(inner: &Arc<SchedulerInner>) {
        let _ = Self::obtain(inner);
    }

    fn arm_timer(inner: &Arc<SchedulerInner>) {
        if inner.shutdown.is_cancelled() {
            return;
        }
        let mut slot = inner.timer.lock().unwrap();
        if slot.is_some() {
            return;
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        drop(slot);

        let inner = inner.clone();
        let interval = inner.flush_interval;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(interval) => {
                    {
                        let mut slot = inner.timer.lock().unwrap();
                        if token.is_cancelled() {
                            // Lost the race against cancel_timer; a newer
                            // timer may own the slot now.
                            return;
                        }
                        *slot = None;
                    }
                    FlushScheduler::spark(&inner);
                }
            }
        });
    }

    fn cancel_timer(inner: &SchedulerInner) {
        if let Some(token) = inner.timer.lock().unwrap().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{IngestionResponse, IngestionTransport};
    use async_trait::async_trait;
    use lantern_core::{EventType, IngestionEvent, Result};

    struct MockTransport {
        batch_sizes: Mutex<Vec<usize>>,
        delay: Option<Duration>,
    }

    impl MockTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                batch_sizes: Mutex::new(Vec::new()),
                delay: None,
            })
        }

        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                batch_sizes: Mutex::new(Vec::new()),
                delay: Some(delay),
            })
        }

        fn calls(&self) -> usize {
            self.batch_sizes.lock().unwrap().len()
        }

        fn sizes(&self) -> Vec<usize> {
            let mut sizes = self.batch_sizes.lock().unwrap().clone();
            sizes.sort_unstable();
            sizes
        }
    }

    #[async_trait]
    impl IngestionTransport for MockTransport {
        async fn send_batch(&self, batch: &[IngestionEvent]) -> Result<IngestionResponse> {
            self.batch_sizes.lock().unwrap().push(batch.len());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(IngestionResponse::default())
        }
    }

    fn setup(
        transport: Arc<MockTransport>,
        flush_at: usize,
        flush_interval: Duration,
    ) -> (Arc<EventQueue>, FlushScheduler) {
        let queue = Arc::new(EventQueue::new(10_000));
        let dispatcher = BatchDispatcher::new(queue.clone(), transport, 100);
        let scheduler = FlushScheduler::new(queue.clone(), dispatcher, flush_at, flush_interval);
        (queue, scheduler)
    }

    fn event(n: usize) -> IngestionEvent {
        IngestionEvent::new(EventType::EventCreate, serde_json::json!({"n": n}))
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..1_000 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met in time");
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_on_empty_queue_completes() {
        let transport = MockTransport::new();
        let (_queue, scheduler) = setup(transport.clone(), 10, Duration::from_secs(1));

        scheduler.flush().await;
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_trigger_flushes_once() {
        let transport = MockTransport::new();
        let (queue, scheduler) = setup(transport.clone(), 5, Duration::from_secs(1));

        for n in 0..5 {
            queue.enqueue(event(n));
            scheduler.on_event();
        }

        wait_until(|| queue.stats().delivered == 5).await;
        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.sizes(), vec![5]);

        // The timer armed by the sub-threshold events was cancelled when the
        // flush started; advancing past the interval must not flush again.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_flushes_coalesce() {
        let transport = MockTransport::with_delay(Duration::from_millis(100));
        let (queue, scheduler) = setup(transport.clone(), 100, Duration::from_secs(60));

        queue.enqueue(event(0));
        queue.enqueue(event(1));

        tokio::join!(scheduler.flush(), scheduler.flush());

        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.sizes(), vec![2]);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_sub_threshold_events() {
        let transport = MockTransport::new();
        let (queue, scheduler) = setup(transport.clone(), 100, Duration::from_secs(1));

        for n in 0..3 {
            queue.enqueue(event(n));
            scheduler.on_event();
        }
        assert_eq!(transport.calls(), 0);

        // Three on_event calls arm exactly one timer, so one flush fires.
        tokio::time::sleep(Duration::from_secs(2)).await;
        wait_until(|| queue.stats().delivered == 3).await;
        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.sizes(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_enqueued_mid_flush_get_followup() {
        let transport = MockTransport::with_delay(Duration::from_millis(50));
        let (queue, scheduler) = setup(transport.clone(), 1, Duration::from_secs(60));

        queue.enqueue(event(0));
        scheduler.on_event();
        // Let the first flush snapshot its single event and block in the
        // transport before the second event lands.
        tokio::time::sleep(Duration::from_millis(1)).await;

        queue.enqueue(event(1));
        scheduler.on_event();

        wait_until(|| queue.stats().delivered == 2).await;
        assert_eq!(transport.calls(), 2);
        assert_eq!(transport.sizes(), vec![1, 1]);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_and_stops() {
        let transport = MockTransport::new();
        let (queue, scheduler) = setup(transport.clone(), 100, Duration::from_secs(1));

        for n in 0..3 {
            queue.enqueue(event(n));
            scheduler.on_event();
        }

        scheduler.shutdown().await;
        assert!(queue.is_empty());
        assert_eq!(queue.stats().delivered, 3);
        assert_eq!(transport.calls(), 1);

        // Post-shutdown events are not picked up automatically.
        queue.enqueue(event(3));
        scheduler.on_event();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.calls(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_backlog_splits_into_batches() {
        let transport = MockTransport::new();
        let (queue, scheduler) = setup(transport.clone(), 1_000, Duration::from_secs(60));

        for n in 0..250 {
            queue.enqueue(event(n));
        }

        scheduler.flush().await;
        assert_eq!(transport.sizes(), vec![50, 100, 100]);
        assert_eq!(queue.stats().delivered, 250);
    }
}
