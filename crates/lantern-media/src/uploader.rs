//! Background media uploads.
//!
//! Each scheduled upload runs on its own task: negotiate an upload URL,
//! verify the server derived the same content id, PUT the bytes with
//! retries, then report the outcome. Nothing here ever returns an error to
//! the caller; failures end in a log line and a FAILED status report.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use lantern_core::Error;
use tokio::task::JoinHandle;

use crate::reference::sha256_standard_base64;
use crate::scan::ScannedMedia;
use crate::transport::{MediaTransport, UploadStatusPatch, UploadUrlRequest};

/// Which event field the media content appeared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaField {
    Input,
    Output,
    Metadata,
}

impl MediaField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaField::Input => "input",
            MediaField::Output => "output",
            MediaField::Metadata => "metadata",
        }
    }
}

impl fmt::Display for MediaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the trace the content was found; sent along with the upload
/// URL request so the platform can link media to observations.
#[derive(Debug, Clone)]
pub struct UploadContext {
    pub trace_id: String,
    pub observation_id: Option<String>,
    pub field: MediaField,
}

/// Schedules and tracks upload tasks.
///
/// The seen-set spans the uploader's lifetime: content already scheduled
/// once is never scheduled again, no matter how many payloads it appears
/// in. `schedule` must be called within a Tokio runtime.
pub struct MediaUploader {
    transport: Arc<dyn MediaTransport>,
    seen: DashMap<String, ()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    max_retries: u32,
    base_delay: Duration,
}

impl MediaUploader {
    pub fn new(transport: Arc<dyn MediaTransport>, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            transport,
            seen: DashMap::new(),
            handles: Mutex::new(Vec::new()),
            max_retries,
            base_delay,
        }
    }

    /// Spawns an upload for this content unless it was already scheduled.
    pub fn schedule(&self, media: ScannedMedia, context: UploadContext) {
        if self
            .seen
            .insert(media.reference.content_id.clone(), ())
            .is_some()
        {
            return;
        }
        let transport = self.transport.clone();
        let max_retries = self.max_retries;
        let base_delay = self.base_delay;
        let handle = tokio::spawn(async move {
            run_upload(transport, media, context, max_retries, base_delay).await;
        });
        self.handles.lock().unwrap().push(handle);
    }

    /// Waits for every upload scheduled so far. Uploads scheduled while
    /// this runs belong to the next flush.
    pub async fn flush(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        if handles.is_empty() {
            return;
        }
        tracing::debug!("waiting for {} media uploads", handles.len());
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("media upload task panicked: {}", e);
            }
        }
    }
}

async fn run_upload(
    transport: Arc<dyn MediaTransport>,
    media: ScannedMedia,
    context: UploadContext,
    max_retries: u32,
    base_delay: Duration,
) {
    let content_id = media.reference.content_id.clone();
    let sha256 = sha256_standard_base64(&media.bytes);
    let request = UploadUrlRequest {
        trace_id: context.trace_id,
        observation_id: context.observation_id,
        content_type: media.reference.content_type.clone(),
        content_length: media.bytes.len(),
        sha_256_hash: sha256.clone(),
        field: context.field.as_str().to_string(),
    };

    let response = match transport.request_upload(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("upload url request for media {} failed: {}", content_id, e);
            return;
        }
    };

    if response.media_id != content_id {
        // The server hashes the same bytes we did; a mismatch means an id
        // derivation bug, and uploading under the wrong id would corrupt
        // the store.
        tracing::error!(
            "media id mismatch for {}: server returned {}, aborting upload",
            content_id,
            response.media_id
        );
        return;
    }

    let Some(upload_url) = response.upload_url else {
        tracing::debug!("media {} already uploaded, skipping", content_id);
        return;
    };

    let started = Instant::now();
    let mut attempt: u32 = 0;
    let outcome = loop {
        match transport
            .put_bytes(
                &upload_url,
                &media.reference.content_type,
                &sha256,
                &media.bytes,
            )
            .await
        {
            Ok(status) => break Ok(status),
            Err(e) => {
                if attempt >= max_retries {
                    break Err(e);
                }
                let backoff = base_delay * 2u32.pow(attempt) + jitter();
                tracing::warn!(
                    "media upload attempt {} for {} failed, retrying in {:?}: {}",
                    attempt + 1,
                    content_id,
                    backoff,
                    e
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let patch = match &outcome {
        Ok(status) => UploadStatusPatch {
            uploaded_at: now_rfc3339(),
            upload_http_status: *status,
            upload_http_error: None,
            upload_time_ms: Some(elapsed_ms),
        },
        Err(e) => {
            tracing::error!(
                "media upload for {} failed after {} attempts: {}",
                content_id,
                attempt + 1,
                e
            );
            UploadStatusPatch {
                uploaded_at: now_rfc3339(),
                upload_http_status: error_status(e),
                upload_http_error: Some(e.to_string()),
                upload_time_ms: Some(elapsed_ms),
            }
        }
    };

    if let Err(e) = transport.report_status(&content_id, &patch).await {
        tracing::warn!(
            "failed to report upload status for media {}: {}",
            content_id,
            e
        );
    }
}

fn error_status(error: &Error) -> u16 {
    match error {
        Error::Api { status, .. } => *status,
        _ => 0,
    }
}

fn jitter() -> Duration {
    Duration::from_millis((rand::random::<f64>() * 200.0) as u64)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
