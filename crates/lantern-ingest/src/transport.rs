//! Ingestion transport: the trait the dispatcher sends through, plus the
//! HTTP implementation used in production.

use async_trait::async_trait;
use lantern_core::{Error, IngestionEvent, LanternConfig, Result, SDK_NAME, SDK_VERSION};
use serde::{Deserialize, Serialize};

/// Per-item acknowledgement inside an ingestion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSuccess {
    pub id: String,
    #[serde(default)]
    pub status: u16,
}

/// Per-item rejection inside an ingestion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionErrorItem {
    pub id: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

/// Structured result of one batch send.
///
/// The endpoint may accept part of a batch and reject the rest (HTTP 207);
/// both lists refer to event ids from the submitted batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResponse {
    #[serde(default)]
    pub successes: Vec<IngestionSuccess>,
    #[serde(default)]
    pub errors: Vec<IngestionErrorItem>,
}

/// Delivery backend for event batches.
///
/// A transport error means the whole batch failed; a returned response may
/// still carry per-item errors. Implementations apply their own hard
/// per-request timeout.
#[async_trait]
pub trait IngestionTransport: Send + Sync {
    async fn send_batch(&self, batch: &[IngestionEvent]) -> Result<IngestionResponse>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestionRequest<'a> {
    batch: &'a [IngestionEvent],
    metadata: BatchMetadata<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchMetadata<'a> {
    sdk_name: &'a str,
    sdk_version: &'a str,
    public_key: &'a str,
}

/// reqwest-backed transport for `POST /api/public/ingestion`.
pub struct HttpIngestionTransport {
    client: reqwest::Client,
    host: String,
    public_key: String,
    secret_key: String,
}

impl HttpIngestionTransport {
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
impl IngestionTransport for HttpIngestionTransport {
    async fn send_batch(&self, batch: &[IngestionEvent]) -> Result<IngestionResponse> {
        let url = format!("{}/api/public/ingestion", self.host);
        let request = IngestionRequest {
            batch,
            metadata: BatchMetadata {
                sdk_name: SDK_NAME,
                sdk_version: SDK_VERSION,
                public_key: &self.public_key,
            },
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .header("X-Lantern-Sdk-Name", SDK_NAME)
            .header("X-Lantern-Sdk-Version", SDK_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::transport(format!("ingestion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), error_text));
        }

        // 2xx including 207 multi-status; per-item errors live in the body
        response
            .json::<IngestionResponse>()
            .await
            .map_err(|e| Error::transport(format!("failed to parse ingestion response: {e}")))
    }
}
