//! Fluent handles for building trace trees.
//!
//! A handle carries nothing but ids and a client clone; dropping one has
//! no effect on the recorded data. Ending or updating an observation
//! enqueues the matching `*-update` event, and a trace update re-sends
//! `trace-create` (the ingestion API upserts by id).

use lantern_core::{now_rfc3339, EventType};

use crate::client::Lantern;
use crate::model::{ObservationBody, ScoreBody, TraceBody};

#[derive(Clone)]
pub struct TraceHandle {
    client: Lantern,
    trace_id: String,
}

impl TraceHandle {
    pub(crate) fn new(client: Lantern, trace_id: String) -> Self {
        Self { client, trace_id }
    }

    pub fn id(&self) -> &str {
        &self.trace_id
    }

    /// Web UI URL for this trace.
    pub fn url(&self) -> String {
        self.client.trace_url(&self.trace_id)
    }

    pub fn span(&self, mut body: ObservationBody) -> SpanHandle {
        body.trace_id = Some(self.trace_id.clone());
        self.client.span(body)
    }

    pub fn generation(&self, mut body: ObservationBody) -> GenerationHandle {
        body.trace_id = Some(self.trace_id.clone());
        self.client.generation(body)
    }

    pub fn event(&self, mut body: ObservationBody) -> String {
        body.trace_id = Some(self.trace_id.clone());
        self.client.event(body)
    }

    pub fn score(&self, mut body: ScoreBody) {
        body.trace_id = Some(self.trace_id.clone());
        self.client.score(body);
    }

    /// Merges more fields into the trace.
    pub fn update(&self, mut body: TraceBody) {
        body.id = Some(self.trace_id.clone());
        self.client.upsert_trace(&body);
    }
}

#[derive(Clone)]
pub struct SpanHandle {
    client: Lantern,
    trace_id: String,
    observation_id: String,
}

impl SpanHandle {
    pub(crate) fn new(client: Lantern, trace_id: String, observation_id: String) -> Self {
        Self {
            client,
            trace_id,
            observation_id,
        }
    }

    pub fn id(&self) -> &str {
        &self.observation_id
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn update(&self, mut body: ObservationBody) {
        body.id = Some(self.observation_id.clone());
        body.trace_id = Some(self.trace_id.clone());
        self.client.update_observation(EventType::SpanUpdate, &body);
    }

    /// Marks the span finished now.
    pub fn end(&self) {
        self.end_with(ObservationBody::default());
    }

    /// Marks the span finished, merging final fields (output, status, ...).
    pub fn end_with(&self, mut body: ObservationBody) {
        if body.end_time.is_none() {
            body.end_time = Some(now_rfc3339());
        }
        self.update(body);
    }

    pub fn score(&self, mut body: ScoreBody) {
        body.trace_id = Some(self.trace_id.clone());
        body.observation_id = Some(self.observation_id.clone());
        self.client.score(body);
    }

    pub fn span(&self, mut body: ObservationBody) -> SpanHandle {
        body.trace_id = Some(self.trace_id.clone());
        body.parent_observation_id = Some(self.observation_id.clone());
        self.client.span(body)
    }

    pub fn generation(&self, mut body: ObservationBody) -> GenerationHandle {
        body.trace_id = Some(self.trace_id.clone());
        body.parent_observation_id = Some(self.observation_id.clone());
        self.client.generation(body)
    }

    pub fn event(&self, mut body: ObservationBody) -> String {
        body.trace_id = Some(self.trace_id.clone());
        body.parent_observation_id = Some(self.observation_id.clone());
        self.client.event(body)
    }
}

#[derive(Clone)]
pub struct GenerationHandle {
    client: Lantern,
    trace_id: String,
    observation_id: String,
}

impl GenerationHandle {
    pub(crate) fn new(client: Lantern, trace_id: String, observation_id: String) -> Self {
        Self {
            client,
            trace_id,
            observation_id,
        }
    }

    pub fn id(&self) -> &str {
        &self.observation_id
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn update(&self, mut body: ObservationBody) {
        body.id = Some(self.observation_id.clone());
        body.trace_id = Some(self.trace_id.clone());
        self.client
            .update_observation(EventType::GenerationUpdate, &body);
    }

    /// Marks the generation finished now.
    pub fn end(&self) {
        self.end_with(ObservationBody::default());
    }

    /// Marks the generation finished, merging final fields (output, usage,
    /// ...).
    pub fn end_with(&self, mut body: ObservationBody) {
        if body.end_time.is_none() {
            body.end_time = Some(now_rfc3339());
        }
        self.update(body);
    }

    pub fn score(&self, mut body: ScoreBody) {
        body.trace_id = Some(self.trace_id.clone());
        body.observation_id = Some(self.observation_id.clone());
        self.client.score(body);
    }

    pub fn event(&self, mut body: ObservationBody) -> String {
        body.trace_id = Some(self.trace_id.clone());
        body.parent_observation_id = Some(self.observation_id.clone());
        self.client.event(body)
    }
}
