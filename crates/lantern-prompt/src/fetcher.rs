//! Prompt API access: the trait the cache refreshes through, plus the HTTP
//! implementation.

use async_trait::async_trait;
use lantern_core::{Error, LanternConfig, Result};

use crate::types::{CreatePromptRequest, Prompt};

/// Remote prompt store operations.
///
/// `fetch` is the hot path the cache goes through; `create` and
/// `update_labels` exist so writes can invalidate through the same seam.
#[async_trait]
pub trait PromptFetcher: Send + Sync {
    async fn fetch(&self, name: &str, version: Option<u32>, label: Option<&str>)
        -> Result<Prompt>;

    async fn create(&self, request: &CreatePromptRequest) -> Result<Prompt>;

    async fn update_labels(&self, name: &str, version: u32, labels: &[String]) -> Result<Prompt>;
}

/// reqwest-backed fetcher for the `/api/public/v2/prompts` endpoints.
pub struct HttpPromptFetcher {
    client: reqwest::Client,
    host: String,
    public_key: String,
    secret_key: String,
}

impl HttpPromptFetcher {
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

    async fn parse_prompt(&self, response: reqwest::Response) -> Result<Prompt> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), error_text));
        }
        response
            .json::<Prompt>()
            .await
            .map_err(|e| Error::transport(format!("failed to parse prompt response: {e}")))
    }
}

#[async_trait]
impl PromptFetcher for HttpPromptFetcher {
    async fn fetch(
        &self,
        name: &str,
        version: Option<u32>,
        label: Option<&str>,
    ) -> Result<Prompt> {
        let url = format!("{}/api/public/v2/prompts/{}", self.host, name);
        let mut request = self
            .client
            .get(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key));
        if let Some(version) = version {
            request = request.query(&[("version", version.to_string())]);
        }
        if let Some(label) = label {
            request = request.query(&[("label", label)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("prompt fetch failed: {e}")))?;
        self.parse_prompt(response).await
    }

    async fn create(&self, request: &CreatePromptRequest) -> Result<Prompt> {
        let url = format!("{}/api/public/v2/prompts", self.host);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::transport(format!("prompt create failed: {e}")))?;
        self.parse_prompt(response).await
    }

    async fn update_labels(&self, name: &str, version: u32, labels: &[String]) -> Result<Prompt> {
        let url = format!(
            "{}/api/public/v2/prompts/{}/versions/{}",
            self.host, name, version
        );
        let response = self
            .client
            .patch(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&serde_json::json!({ "newLabels": labels }))
            .send()
            .await
            .map_err(|e| Error::transport(format!("prompt label update failed: {e}")))?;
        self.parse_prompt(response).await
    }
}
