//! Lantern client SDK.
//!
//! Buffers observability events (traces, observations, scores) in a
//! bounded queue, delivers them in background batches, caches prompts with
//! stale-while-revalidate refresh, and externalizes inline media.
//!
//! ```rust,no_run
//! use lantern_client::{Lantern, LanternConfig, ScoreBody, TraceBody};
//!
//! # async fn run() -> lantern_core::Result<()> {
//! let client = Lantern::builder(LanternConfig::new(
//!     "https://lantern.example.com",
//!     "pk-...",
//!     "sk-...",
//! ))
//! .build()?;
//!
//! let trace = client.trace(TraceBody::new("checkout"));
//! trace.score(ScoreBody::numeric("quality", 0.92));
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod handles;
pub mod model;

#[cfg(test)]
mod testing;

pub use client::{Lantern, LanternBuilder};
pub use handles::{GenerationHandle, SpanHandle, TraceHandle};
pub use model::{
    GenerationUsage, ObservationBody, ObservationLevel, ScoreBody, ScoreDataType, ScoreValue,
    TraceBody,
};

// The pieces hosts commonly need alongside the client.
pub use lantern_core::{Error, EventType, IngestionEvent, LanternConfig, Result};
pub use lantern_ingest::QueueStats;
pub use lantern_prompt::{ChatMessage, CreatePromptRequest, GetPromptOptions, Prompt, PromptContent};
