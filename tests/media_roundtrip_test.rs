// Media round-trip tests for the Lantern SDK
// Inline payloads leave as reference tokens and come back byte-identical

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use lantern_client::{Lantern, LanternBuilder, LanternConfig, ObservationBody, TraceBody};
use lantern_core::{Error, IngestionEvent, Result};
use lantern_ingest::{IngestionResponse, IngestionTransport};
use lantern_media::{
    MediaPayload, MediaTransport, UploadStatusPatch, UploadUrlRequest, UploadUrlResponse,
};
use serde_json::json;

// Mock transport that keeps delivered events in memory
struct CapturingTransport {
    events: Mutex<Vec<IngestionEvent>>,
}

impl CapturingTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<IngestionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl IngestionTransport for CapturingTransport {
    async fn send_batch(&self, batch: &[IngestionEvent]) -> Result<IngestionResponse> {
        self.events.lock().unwrap().extend_from_slice(batch);
        Ok(IngestionResponse::default())
    }
}

// Mock media backend that stores uploaded bytes and serves them back,
// deriving ids from the submitted checksum the way the server does
struct MemoryMediaTransport {
    store: Mutex<HashMap<String, (String, Vec<u8>)>>,
    uploads: Mutex<Vec<String>>,
}

impl MemoryMediaTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(HashMap::new()),
            uploads: Mutex::new(Vec::new()),
        })
    }

    fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaTransport for MemoryMediaTransport {
    async fn request_upload(&self, request: &UploadUrlRequest) -> Result<UploadUrlResponse> {
        let digest = STANDARD
            .decode(&request.sha_256_hash)
            .map_err(|e| Error::media(format!("bad checksum: {e}")))?;
        let mut media_id = URL_SAFE_NO_PAD.encode(digest);
        media_id.truncate(22);

        let upload_url = if self.store.lock().unwrap().contains_key(&media_id) {
            None
        } else {
            Some(format!("memory://{media_id}|{}", request.content_type))
        };
        Ok(UploadUrlResponse {
            media_id,
            upload_url,
        })
    }

    async fn put_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        _sha256_base64: &str,
        bytes: &[u8],
    ) -> Result<u16> {
        let media_id = upload_url
            .strip_prefix("memory://")
            .and_then(|rest| rest.split('|').next())
            .ok_or_else(|| Error::media("unexpected upload url"))?;
        self.uploads.lock().unwrap().push(media_id.to_string());
        self.store.lock().unwrap().insert(
            media_id.to_string(),
            (content_type.to_string(), bytes.to_vec()),
        );
        Ok(200)
    }

    async fn report_status(&self, _media_id: &str, _patch: &UploadStatusPatch) -> Result<()> {
        Ok(())
    }

    async fn fetch_media(&self, media_id: &str) -> Result<MediaPayload> {
        let store = self.store.lock().unwrap();
        let (content_type, bytes) = store
            .get(media_id)
            .cloned()
            .ok_or_else(|| Error::api(404, "media not found"))?;
        Ok(MediaPayload {
            content_type,
            bytes,
        })
    }
}

fn media_client(
    transport: Arc<CapturingTransport>,
    media: Arc<MemoryMediaTransport>,
) -> Lantern {
    LanternBuilder::new(LanternConfig::test_defaults())
        .with_flush_at(100)
        .with_ingestion_transport(transport)
        .with_media_transport(media)
        .build()
        .unwrap()
}

const PNG_URI: &str = "data:image/png;base64,AQID";
const WAV_URI: &str = "data:audio/wav;base64,BAUG";

#[tokio::test(start_paused = true)]
async fn test_scan_upload_resolve_round_trip() {
    let transport = CapturingTransport::new();
    let media = MemoryMediaTransport::new();
    let client = media_client(transport.clone(), media.clone());

    let original_input = json!({
        "question": "what is in these files?",
        "attachments": [PNG_URI, WAV_URI],
    });
    client.trace(TraceBody::new("vision").with_input(original_input.clone()));
    client.flush().await;

    // Both payloads were replaced with reference tokens and uploaded
    let events = transport.events();
    assert_eq!(events.len(), 1);
    let stored_input = &events[0].body["input"];
    let image_token = stored_input["attachments"][0].as_str().unwrap();
    let audio_token = stored_input["attachments"][1].as_str().unwrap();
    assert!(image_token.starts_with("@@@lanternMedia:type=image/png|id="));
    assert!(image_token.ends_with("|source=base64_data_uri@@@"));
    assert!(audio_token.starts_with("@@@lanternMedia:type=audio/wav|id="));
    assert_eq!(stored_input["question"], "what is in these files?");
    assert_eq!(media.upload_count(), 2);

    // Resolving reproduces the original value byte for byte
    let resolved = client.resolve_media(stored_input).await;
    assert_eq!(resolved, original_input);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_same_payload_uploads_once() {
    let transport = CapturingTransport::new();
    let media = MemoryMediaTransport::new();
    let client = media_client(transport.clone(), media.clone());

    // The same bytes appear in two fields and again in a second event
    client.trace(
        TraceBody::new("vision")
            .with_input(json!({"image": PNG_URI}))
            .with_output(json!({"echo": PNG_URI})),
    );
    client.span(ObservationBody::new("ocr").with_input(json!(PNG_URI)));
    client.flush().await;

    assert_eq!(media.upload_count(), 1);

    // Every occurrence was replaced with the same token
    let events = transport.events();
    let input_token = events[0].body["input"]["image"].as_str().unwrap().to_string();
    assert_eq!(events[0].body["output"]["echo"], input_token);
    assert_eq!(events[1].body["input"], input_token);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unknown_reference_is_left_in_place() {
    let transport = CapturingTransport::new();
    let media = MemoryMediaTransport::new();
    let client = media_client(transport, media);

    let token = "@@@lanternMedia:type=image/png|id=AAAAAAAAAAAAAAAAAAAAAA|source=base64_data_uri@@@";
    let value = json!({"image": token});
    let resolved = client.resolve_media(&value).await;

    assert_eq!(resolved, value);

    client.shutdown().await;
}
