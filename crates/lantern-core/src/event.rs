use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type tag of an ingestion event, matching the wire names of the
/// ingestion endpoint (`trace-create`, `score-create`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    TraceCreate,
    ScoreCreate,
    SpanCreate,
    SpanUpdate,
    GenerationCreate,
    GenerationUpdate,
    EventCreate,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TraceCreate => "trace-create",
            EventType::ScoreCreate => "score-create",
            EventType::SpanCreate => "span-create",
            EventType::SpanUpdate => "span-update",
            EventType::GenerationCreate => "generation-create",
            EventType::GenerationUpdate => "generation-update",
            EventType::EventCreate => "event-create",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable telemetry fact queued for delivery.
///
/// The envelope carries identity, type, and creation time; the body is an
/// opaque JSON payload whose schema belongs to the remote API. Events are
/// never mutated after construction; the pipeline only moves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionEvent {
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: EventType,

    /// RFC 3339 creation timestamp with millisecond precision
    pub timestamp: String,

    pub body: serde_json::Value,
}

impl IngestionEvent {
    pub fn new(event_type: EventType, body: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            timestamp: now_rfc3339(),
            body,
        }
    }
}

/// Current UTC time as RFC 3339 with millisecond precision, the timestamp
/// format used everywhere on the wire.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
