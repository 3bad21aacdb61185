//! HTTP adapter for the remote rendering call.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::{GenerateViewRequest, GenerateViewResponse};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::RenderService;

const GENERATE_VIEW_PATH: &str = "generate-3d-view";

#[derive(Debug, Error)]
pub enum RenderClientError {
    #[error("invalid render service url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("render service url must use http or https, got '{0}'")]
    UnsupportedScheme(String),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct HttpRenderService {
    http: Client,
    endpoint: Url,
}

impl HttpRenderService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RenderClientError> {
        let endpoint = endpoint_for(base_url)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn endpoint_for(base_url: &str) -> Result<Url, RenderClientError> {
    let trimmed = base_url.trim();
    let mut base = Url::parse(trimmed).map_err(|source| RenderClientError::InvalidUrl {
        url: trimmed.to_string(),
        source,
    })?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(RenderClientError::UnsupportedScheme(base.scheme().to_string()));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(GENERATE_VIEW_PATH)
        .map_err(|source| RenderClientError::InvalidUrl {
            url: trimmed.to_string(),
            source,
        })
}

#[async_trait]
impl RenderService for HttpRenderService {
    async fn generate_view(&self, request: GenerateViewRequest) -> Result<GenerateViewResponse> {
        debug!(endpoint = %self.endpoint, source_len = request.source_image.len(), "requesting 3D view");
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to reach render service at {}", self.endpoint))?
            .error_for_status()
            .context("render service rejected the request")?;
        let body: GenerateViewResponse = res
            .json()
            .await
            .context("render service returned malformed json")?;
        Ok(body)
    }
}

#[cfg(test)]
#[path = "tests/render_client_tests.rs"]
mod tests;
