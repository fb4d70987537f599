//! The Lantern client: the single object applications hold.
//!
//! Telemetry calls (`trace`, `span`, `score`, ...) are synchronous and
//! fire-and-forget: they enqueue an event, nudge the flush scheduler, and
//! return. Delivery happens on background tasks; `flush` and `shutdown`
//! are the only awaited operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lantern_core::{now_rfc3339, EventType, IngestionEvent, LanternConfig, Result};
use lantern_ingest::{
    BatchDispatcher, EventQueue, FlushScheduler, HttpIngestionTransport, IngestionTransport,
    QueueStats,
};
use lantern_media::{
    HttpMediaTransport, MediaField, MediaResolver, MediaScanner, MediaTransport, MediaUploader,
    UploadContext, DEFAULT_MAX_DEPTH,
};
use lantern_prompt::{
    GetPromptOptions, HttpPromptFetcher, Prompt, PromptClient, PromptFetcher,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::handles::{GenerationHandle, SpanHandle, TraceHandle};
use crate::model::{ObservationBody, ScoreBody, TraceBody};

/// Configures and builds a [`Lantern`] client.
///
/// The transport/fetcher injection points exist for tests and for hosts
/// that proxy their own HTTP; production callers normally set config only.
pub struct LanternBuilder {
    config: LanternConfig,
    ingestion_transport: Option<Arc<dyn IngestionTransport>>,
    prompt_fetcher: Option<Arc<dyn PromptFetcher>>,
    media_transport: Option<Arc<dyn MediaTransport>>,
}

impl LanternBuilder {
    pub fn new(config: LanternConfig) -> Self {
        Self {
            config,
            ingestion_transport: None,
            prompt_fetcher: None,
            media_transport: None,
        }
    }

    /// Starts from `LANTERN_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(LanternConfig::from_env()?))
    }

    pub fn with_flush_at(mut self, flush_at: usize) -> Self {
        self.config.flush_at = flush_at;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.config.max_batch_size = max_batch_size;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.config.release = Some(release.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.config.environment = Some(environment.into());
        self
    }

    pub fn with_media_enabled(mut self, enabled: bool) -> Self {
        self.config.media_enabled = enabled;
        self
    }

    pub fn with_ingestion_transport(mut self, transport: Arc<dyn IngestionTransport>) -> Self {
        self.ingestion_transport = Some(transport);
        self
    }

    pub fn with_prompt_fetcher(mut self, fetcher: Arc<dyn PromptFetcher>) -> Self {
        self.prompt_fetcher = Some(fetcher);
        self
    }

    pub fn with_media_transport(mut self, transport: Arc<dyn MediaTransport>) -> Self {
        self.media_transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Lantern> {
        let Self {
            config,
            ingestion_transport,
            prompt_fetcher,
            media_transport,
        } = self;
        config.validate()?;

        let ingestion: Arc<dyn IngestionTransport> = match ingestion_transport {
            Some(transport) => transport,
            None => Arc::new(HttpIngestionTransport::new(&config)?),
        };
        let queue = Arc::new(EventQueue::new(config.queue_capacity));
        let dispatcher = BatchDispatcher::new(queue.clone(), ingestion, config.max_batch_size);
        let scheduler = FlushScheduler::new(
            queue.clone(),
            dispatcher,
            config.flush_at,
            config.flush_interval(),
        );

        let fetcher: Arc<dyn PromptFetcher> = match prompt_fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpPromptFetcher::new(&config)?),
        };
        let prompts = PromptClient::new(fetcher, config.cache_ttl());

        let media = if config.media_enabled {
            let transport: Arc<dyn MediaTransport> = match media_transport {
                Some(transport) => transport,
                None => Arc::new(HttpMediaTransport::new(&config)?),
            };
            Some(MediaComponents {
                scanner: MediaScanner::new(DEFAULT_MAX_DEPTH),
                uploader: MediaUploader::new(
                    transport.clone(),
                    config.upload_max_retries,
                    config.upload_base_delay(),
                ),
                resolver: MediaResolver::new(transport, DEFAULT_MAX_DEPTH),
            })
        } else {
            None
        };

        tracing::debug!(
            "lantern client ready (host {}, flush_at {}, flush_interval {:?})",
            config.host,
            config.flush_at,
            config.flush_interval()
        );

        Ok(Lantern {
            inner: Arc::new(LanternInner {
                config,
                queue,
                scheduler,
                prompts,
                media,
                shutdown: AtomicBool::new(false),
            }),
        })
    }
}

struct MediaComponents {
    scanner: MediaScanner,
    uploader: MediaUploader,
    resolver: MediaResolver,
}

struct LanternInner {
    config: LanternConfig,
    queue: Arc<EventQueue>,
    scheduler: FlushScheduler,
    prompts: PromptClient,
    media: Option<MediaComponents>,
    shutdown: AtomicBool,
}

/// Handle to the SDK. Cheap to clone; all clones share one pipeline.
#[derive(Clone)]
pub struct Lantern {
    inner: Arc<LanternInner>,
}

impl Lantern {
    pub fn builder(config: LanternConfig) -> LanternBuilder {
        LanternBuilder::new(config)
    }

    /// Builds a client from `LANTERN_*` environment variables.
    pub fn from_env() -> Result<Self> {
        LanternBuilder::from_env()?.build()
    }

    /// Starts a trace and returns a handle for nesting observations under
    /// it. The trace id is generated unless the body carries one.
    pub fn trace(&self, mut body: TraceBody) -> TraceHandle {
        let trace_id = body.id.get_or_insert_with(new_id).clone();
        if body.timestamp.is_none() {
            body.timestamp = Some(now_rfc3339());
        }
        if body.release.is_none() {
            body.release = self.inner.config.release.clone();
        }
        if body.environment.is_none() {
            body.environment = self.inner.config.environment.clone();
        }
        self.emit_with_media(EventType::TraceCreate, &body, &trace_id, None);
        TraceHandle::new(self.clone(), trace_id)
    }

    /// Starts a span. Generates a trace id when the body names none
    /// (an implicit single-observation trace).
    pub fn span(&self, body: ObservationBody) -> SpanHandle {
        let (trace_id, observation_id) = self.start_observation(EventType::SpanCreate, body);
        SpanHandle::new(self.clone(), trace_id, observation_id)
    }

    /// Starts a generation (an LLM call observation).
    pub fn generation(&self, body: ObservationBody) -> GenerationHandle {
        let (trace_id, observation_id) = self.start_observation(EventType::GenerationCreate, body);
        GenerationHandle::new(self.clone(), trace_id, observation_id)
    }

    /// Records a point-in-time event observation. Returns its id.
    pub fn event(&self, body: ObservationBody) -> String {
        let (_, observation_id) = self.start_observation(EventType::EventCreate, body);
        observation_id
    }

    /// Records a score.
    pub fn score(&self, mut body: ScoreBody) {
        if body.id.is_none() {
            body.id = Some(new_id());
        }
        if body.environment.is_none() {
            body.environment = self.inner.config.environment.clone();
        }
        match serde_json::to_value(&body) {
            Ok(value) => self.enqueue(EventType::ScoreCreate, value),
            Err(e) => tracing::error!("failed to serialize score body: {}", e),
        }
    }

    /// Delivers everything currently buffered: pending media uploads, then
    /// queued events.
    pub async fn flush(&self) {
        if let Some(media) = &self.inner.media {
            media.uploader.flush().await;
        }
        self.inner.scheduler.flush().await;
    }

    /// Drains the pipeline completely and stops background work. After
    /// this resolves, telemetry calls are dropped with a warning.
    pub async fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        if let Some(media) = &self.inner.media {
            media.uploader.flush().await;
        }
        self.inner.scheduler.shutdown().await;
        tracing::debug!("lantern client shut down");
    }

    /// Web UI URL for a trace.
    pub fn trace_url(&self, trace_id: &str) -> String {
        format!(
            "{}/trace/{}",
            self.inner.config.host.trim_end_matches('/'),
            trace_id
        )
    }

    /// Delivery counters, for hosts that want drop/delivery visibility
    /// without scraping logs.
    pub fn stats(&self) -> QueueStats {
        self.inner.queue.stats()
    }

    /// The prompt client (fetching, caching, create/update).
    pub fn prompts(&self) -> &PromptClient {
        &self.inner.prompts
    }

    /// Shorthand for [`PromptClient::get`].
    pub async fn get_prompt(&self, name: &str, opts: GetPromptOptions) -> Result<Arc<Prompt>> {
        self.inner.prompts.get(name, opts).await
    }

    /// Replaces media reference tokens in `value` with data URIs, fetching
    /// content from the platform. Returns the value unchanged when media
    /// handling is disabled.
    pub async fn resolve_media(&self, value: &Value) -> Value {
        match &self.inner.media {
            Some(media) => media.resolver.resolve_references(value).await,
            None => value.clone(),
        }
    }

    pub(crate) fn start_observation(
        &self,
        event_type: EventType,
        mut body: ObservationBody,
    ) -> (String, String) {
        let trace_id = body.trace_id.get_or_insert_with(new_id).clone();
        let observation_id = body.id.get_or_insert_with(new_id).clone();
        if body.start_time.is_none() {
            body.start_time = Some(now_rfc3339());
        }
        if body.environment.is_none() {
            body.environment = self.inner.config.environment.clone();
        }
        self.emit_with_media(event_type, &body, &trace_id, Some(&observation_id));
        (trace_id, observation_id)
    }

    pub(crate) fn update_observation(&self, event_type: EventType, body: &ObservationBody) {
        let trace_id = body.trace_id.clone().unwrap_or_default();
        self.emit_with_media(event_type, body, &trace_id, body.id.as_deref());
    }

    pub(crate) fn upsert_trace(&self, body: &TraceBody) {
        let trace_id = body.id.clone().unwrap_or_default();
        self.emit_with_media(EventType::TraceCreate, body, &trace_id, None);
    }

    fn emit_with_media<T: Serialize>(
        &self,
        event_type: EventType,
        body: &T,
        trace_id: &str,
        observation_id: Option<&str>,
    ) {
        match serde_json::to_value(body) {
            Ok(mut value) => {
                self.externalize_media(&mut value, trace_id, observation_id);
                self.enqueue(event_type, value);
            }
            Err(e) => tracing::error!("failed to serialize {} body: {}", event_type, e),
        }
    }

    /// Swaps inline media in the body's input/output/metadata for reference
    /// tokens and schedules the uploads.
    fn externalize_media(&self, body: &mut Value, trace_id: &str, observation_id: Option<&str>) {
        let Some(media) = &self.inner.media else {
            return;
        };
        let Some(map) = body.as_object_mut() else {
            return;
        };
        for (key, field) in [
            ("input", MediaField::Input),
            ("output", MediaField::Output),
            ("metadata", MediaField::Metadata),
        ] {
            if let Some(value) = map.get_mut(key) {
                let (replaced, found) = media.scanner.scan_and_replace(value);
                *value = replaced;
                for item in found {
                    media.uploader.schedule(
                        item,
                        UploadContext {
                            trace_id: trace_id.to_string(),
                            observation_id: observation_id.map(String::from),
                            field,
                        },
                    );
                }
            }
        }
    }

    fn enqueue(&self, event_type: EventType, body: Value) {
        if self.inner.shutdown.load(Ordering::SeqCst) {
            tracing::warn!("client is shut down, dropping {} event", event_type);
            return;
        }
        let event = IngestionEvent::new(event_type, body);
        if self.inner.queue.enqueue(event) {
            self.inner.scheduler.on_event();
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
