use std::time::Duration;

use futures_util::StreamExt;
use jobdesk_logging::{desk_debug, desk_warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    ApiError, BulkApplyResponse, FailureKind, FetchResponse, ProgressStream, UpdateStatus,
};

/// Header the backend reads the page-embedded CSRF token from.
pub const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub check_updates: String,
    pub fetch_new_data: String,
    pub bulk_apply: String,
    pub bulk_apply_progress: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            check_updates: "/api/check_updates".to_string(),
            fetch_new_data: "/fetch_new_data".to_string(),
            bulk_apply: "/bulk_apply".to_string(),
            bulk_apply_progress: "/bulk_apply_progress".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    /// Sent on every mutating request; empty when the page had none.
    pub csrf_token: String,
    pub connect_timeout: Duration,
    /// Bound for one-shot requests. The progress stream has no total timeout.
    pub request_timeout: Duration,
    pub paths: EndpointPaths,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            csrf_token: String::new(),
            connect_timeout: Duration::from_secs(10),
            // Fetching runs the crawler server-side and can take minutes.
            request_timeout: Duration::from_secs(600),
            paths: EndpointPaths::default(),
        }
    }
}

#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn check_updates(&self) -> Result<UpdateStatus, ApiError>;

    async fn fetch_new_data(&self, max_items: Option<u32>) -> Result<FetchResponse, ApiError>;

    async fn bulk_apply(&self, urls: &[String]) -> Result<BulkApplyResponse, ApiError>;

    /// Opens the push subscription for bulk-apply progress.
    async fn subscribe_progress(&self) -> Result<ProgressStream, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: ClientSettings,
    base: reqwest::Url,
    client: reqwest::Client,
    stream_client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base = reqwest::Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
            stream_client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        desk_debug!("POST {} ({} bytes)", url, payload.len());

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(CSRF_HEADER, self.settings.csrf_token.as_str())
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            desk_warn!("POST {} answered {}", path, status);
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    async fn check_updates(&self) -> Result<UpdateStatus, ApiError> {
        self.post_json(&self.settings.paths.check_updates, &serde_json::json!({}))
            .await
    }

    async fn fetch_new_data(&self, max_items: Option<u32>) -> Result<FetchResponse, ApiError> {
        let body = match max_items {
            Some(max_items) => serde_json::json!({ "max_items": max_items }),
            None => serde_json::json!({}),
        };
        self.post_json(&self.settings.paths.fetch_new_data, &body)
            .await
    }

    async fn bulk_apply(&self, urls: &[String]) -> Result<BulkApplyResponse, ApiError> {
        self.post_json(
            &self.settings.paths.bulk_apply,
            &serde_json::json!({ "urls": urls }),
        )
        .await
    }

    async fn subscribe_progress(&self) -> Result<ProgressStream, ApiError> {
        let url = self.endpoint(&self.settings.paths.bulk_apply_progress)?;
        desk_debug!("GET {} (event stream)", url);
        let response = self
            .stream_client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error));
        Ok(ProgressStream::new(body))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
