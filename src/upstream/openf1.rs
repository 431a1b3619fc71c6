use std::time::Duration;

use async_trait::async_trait;

use super::{build_http_client, get_json, UpstreamClient};
use crate::error::{AppError, Result};
use crate::types::PageEnvelope;

/// Telemetry/meetings provider. Responses are bare arrays with no paging,
/// so the envelope always describes the whole result.
pub struct OpenF1Client {
    http: reqwest::Client,
    base_url: String,
}

impl OpenF1Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl UpstreamClient for OpenF1Client {
    fn name(&self) -> &'static str {
        "openf1"
    }

    async fn fetch(
        &self,
        path: &str,
        _data_key: &str,
        _limit: u32,
        _offset: u32,
    ) -> Result<PageEnvelope<serde_json::Value>> {
        let url = format!("{}/{}", self.base_url, path);
        let body = get_json(&self.http, &url).await?;
        let len = body
            .as_array()
            .map(|a| a.len() as u32)
            .ok_or_else(|| AppError::Malformed(format!("{path}: expected a JSON array")))?;
        Ok(PageEnvelope { data: body, total: len, limit: len, offset: 0 })
    }
}
