//! Shared fakes for the crate's tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use lantern_core::{Error, IngestionEvent, LanternConfig, Result};
use lantern_ingest::{IngestionResponse, IngestionTransport};
use lantern_media::{
    MediaPayload, MediaTransport, UploadStatusPatch, UploadUrlRequest, UploadUrlResponse,
};

use crate::client::{Lantern, LanternBuilder};

pub(crate) fn test_config() -> LanternConfig {
    LanternConfig::test_defaults()
}

/// Client wired to in-memory transports.
pub(crate) fn test_client(
    flush_at: usize,
) -> (Lantern, Arc<CapturingTransport>, Arc<MemoryMediaTransport>) {
    let transport = CapturingTransport::new();
    let media = MemoryMediaTransport::new();
    let client = LanternBuilder::new(test_config())
        .with_flush_at(flush_at)
        .with_ingestion_transport(transport.clone())
        .with_media_transport(media.clone())
        .build()
        .unwrap();
    (client, transport, media)
}

/// Records every delivered event and answers success for all of them.
pub(crate) struct CapturingTransport {
    events: Mutex<Vec<IngestionEvent>>,
    batch_count: AtomicUsize,
}

impl CapturingTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            batch_count: AtomicUsize::new(0),
        })
    }

    pub(crate) fn events(&self) -> Vec<IngestionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn batches(&self) -> usize {
        self.batch_count.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_for_events(&self, n: usize) {
        for _ in 0..1_000 {
            if self.events.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} events, got {}", self.events.lock().unwrap().len());
    }
}

#[async_trait]
impl IngestionTransport for CapturingTransport {
    async fn send_batch(&self, batch: &[IngestionEvent]) -> Result<IngestionResponse> {
        self.batch_count.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().extend_from_slice(batch);
        Ok(IngestionResponse::default())
    }
}

/// Media backend that keeps uploaded bytes in memory and serves them back.
pub(crate) struct MemoryMediaTransport {
    store: Mutex<std::collections::HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryMediaTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(std::collections::HashMap::new()),
        })
    }

    pub(crate) fn stored_count(&self) -> usize {
        self.store.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaTransport for MemoryMediaTransport {
    async fn request_upload(&self, request: &UploadUrlRequest) -> Result<UploadUrlResponse> {
        // Derive the id the way the server does, from the checksum.
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
