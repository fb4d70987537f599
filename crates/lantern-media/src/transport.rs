//! Media API access: upload-URL negotiation, the direct PUT to object
//! storage, status reporting, and content retrieval.

use async_trait::async_trait;
use lantern_core::{Error, LanternConfig, Result};
use serde::{Deserialize, Serialize};

/// Body for `POST /api/public/media` asking for an upload slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_id: Option<String>,
    pub content_type: String,
    pub content_length: usize,
    /// SHA-256 of the content in standard base64.
    pub sha_256_hash: String,
    /// Which event field the content appeared in (`input`, `output`,
    /// `metadata`).
    pub field: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub media_id: String,
    /// Absent when the server already holds this content; the caller skips
    /// the PUT entirely.
    #[serde(default)]
    pub upload_url: Option<String>,
}

/// Body for `PATCH /api/public/media/{id}` after an upload attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusPatch {
    pub uploaded_at: String,
    /// HTTP status of the PUT; zero when no response was received.
    pub upload_http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_http_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetMediaResponse {
    content_type: String,
    url: String,
}

/// Retrieved media content.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The media endpoints as a seam.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn request_upload(&self, request: &UploadUrlRequest) -> Result<UploadUrlResponse>;

    /// PUTs the raw bytes to the presigned URL. Returns the HTTP status on
    /// success; a non-2xx response is an `Api` error carrying that status.
    async fn put_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        sha256_base64: &str,
        bytes: &[u8],
    ) -> Result<u16>;

    async fn report_status(&self, media_id: &str, patch: &UploadStatusPatch) -> Result<()>;

    async fn fetch_media(&self, media_id: &str) -> Result<MediaPayload>;
}

/// reqwest-backed implementation against the platform media endpoints.
pub struct HttpMediaTransport {
    client: reqwest::Client,
    host: String,
    public_key: String,
    secret_key: String,
}

impl HttpMediaTransport {
    pub fn new(config: &LanternConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            public_key: config.public_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl MediaTransport for HttpMediaTransport {
    async fn request_upload(&self, request: &UploadUrlRequest) -> Result<UploadUrlResponse> {
        let url = format!("{}/api/public/media", self.host);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::transport(format!("upload url request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), error_text));
        }
        response
            .json::<UploadUrlResponse>()
            .await
            .map_err(|e| Error::transport(format!("failed to parse upload url response: {e}")))
    }

    async fn put_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        sha256_base64: &str,
        bytes: &[u8],
    ) -> Result<u16> {
        let response = self
            .client
            .put(upload_url)
            .header("Content-Type", content_type)
            .header("x-amz-checksum-sha256", sha256_base64)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| Error::transport(format!("media upload failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), error_text));
        }
        Ok(status.as_u16())
    }

    async fn report_status(&self, media_id: &str, patch: &UploadStatusPatch) -> Result<()> {
        let url = format!("{}/api/public/media/{}", self.host, media_id);
        let response = self
            .client
            .patch(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(patch)
            .send()
            .await
            .map_err(|e| Error::transport(format!("media status report failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), error_text));
        }
        Ok(())
    }

    async fn fetch_media(&self, media_id: &str) -> Result<MediaPayload> {
        let url = format!("{}/api/public/media/{}", self.host, media_id);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .send()
            .await
            .map_err(|e| Error::transport(format!("media lookup failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), error_text));
        }
        let info = response
            .json::<GetMediaResponse>()
            .await
            .map_err(|e| Error::transport(format!("failed to parse media response: {e}")))?;

        // Presigned download URL, no auth header.
        let content = self
            .client
            .get(&info.url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("media download failed: {e}")))?;
        let status = content.status();
        if !status.is_success() {
            return Err(Error::api(status.as_u16(), "media download failed"));
        }
        let bytes = content
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("media download failed: {e}")))?;

        Ok(MediaPayload {
            content_type: info.content_type,
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request_wire_shape() {
        let request = UploadUrlRequest {
            trace_id: "trace-1".into(),
            observation_id: None,
            content_type: "image/png".into(),
            content_length: 3,
            sha_256_hash: "abc=".into(),
            field: "input".into(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["traceId"], "trace-1");
        assert_eq!(value["sha256Hash"], "abc=");
        assert_eq!(value["field"], "input");
        assert!(value.get("observationId").is_none());
    }

    #[test]
    fn test_upload_url_response_tolerates_missing_url() {
        let response: UploadUrlResponse =
            serde_json::from_str(r#"{"mediaId": "abc"}"#).unwrap();
        assert_eq!(response.media_id, "abc");
        assert!(response.upload_url.is_none());
    }
}
