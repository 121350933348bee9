//! Network seam of the request pipeline.

use std::time::Duration;

use {
    async_trait::async_trait,
    storefront_config::ApiConfig,
    tracing::{debug, trace},
    url::Url,
};

use crate::{
    error::ApiError,
    request::{ApiResponse, OutboundRequest},
};

/// Executes a single request exactly as given. No credentials are added and
/// no recovery happens at this level.
///
/// Non-success statuses come back as [`ApiError::Status`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<ApiResponse, ApiError>;
}

/// `reqwest`-backed transport rooted at the API base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(
            api.normalized_base_url(),
            Duration::from_secs(api.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is joined onto the base URL.
    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        Ok(Url::parse(&format!(
            "{}/{}",
            self.base_url,
            path.trim_start_matches('/')
        ))?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(request.path())?;
        trace!(method = %request.method(), %url, "sending request");

        let mut builder = self
            .client
            .request(request.method().clone(), url)
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;

        if !status.is_success() {
            debug!(method = %request.method(), path = %request.path(), %status, "request failed");
            return Err(ApiError::Status {
                status,
                headers,
                body,
            });
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
