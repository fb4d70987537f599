//! # Lantern Ingestion Pipeline
//!
//! The batched event-delivery pipeline: a capacity-bounded event queue, a
//! dispatcher that drains it into bounded-size concurrent batches, and a
//! scheduler that decides when a flush happens.
//!
//! ## Overview
//!
//! Telemetry producers enqueue [`lantern_core::IngestionEvent`]s and move on;
//! the pipeline takes care of delivery in the background:
//!
//! - **Best effort**: a full queue drops the new event (logged and counted),
//!   a failed batch is abandoned (logged and counted). Nothing in the flush
//!   path ever returns an error to the host application.
//! - **Bounded work**: a flush only covers events present when it started;
//!   later arrivals belong to the next flush.
//! - **Single flight**: concurrent flush callers share one in-flight drain
//!   instead of racing independent ones.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lantern_core::{EventType, IngestionEvent, LanternConfig};
//! use lantern_ingest::{BatchDispatcher, EventQueue, FlushScheduler, HttpIngestionTransport};
//! use std::sync::Arc;
//!
//! # async fn example() -> lantern_core::Result<()> {
//! let config = LanternConfig::from_env()?;
//! let queue = Arc::new(EventQueue::new(config.queue_capacity));
//! let transport = Arc::new(HttpIngestionTransport::new(&config)?);
//! let dispatcher = BatchDispatcher::new(queue.clone(), transport, config.max_batch_size);
//! let scheduler = FlushScheduler::new(
//!     queue.clone(),
//!     dispatcher,
//!     config.flush_at,
//!     config.flush_interval(),
//! );
//!
//! if queue.enqueue(IngestionEvent::new(
//!     EventType::TraceCreate,
//!     serde_json::json!({"name": "checkout"}),
//! )) {
//!     scheduler.on_event();
//! }
//!
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod queue;
pub mod scheduler;
pub mod transport;

pub use dispatcher::BatchDispatcher;
pub use queue::{EventQueue, QueueStats};
pub use scheduler::FlushScheduler;
pub use transport::{
    HttpIngestionTransport, IngestionErrorItem, IngestionResponse, IngestionSuccess,
    IngestionTransport,
};
