use std::time::Duration;

use async_trait::async_trait;

use super::{build_http_client, get_json, UpstreamClient};
use crate::error::Result;
use crate::types::PageEnvelope;

/// Secondary points provider (pit-stop charts). Some of its resources wrap
/// the payload in a top-level `data` object; that wrapper is removed here.
pub struct DhlClient {
    http: reqwest::Client,
    base_url: String,
}

impl DhlClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }
}

#[async_trait]
impl UpstreamClient for DhlClient {
    fn name(&self) -> &'static str {
        "dhl"
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
        Ok(PageEnvelope { data: unwrap_data(body), total: 1, limit: 1, offset: 0 })
    }
}

fn unwrap_data(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut root) if root.get("data").is_some_and(|d| d.is_object()) => {
            root.remove("data").unwrap_or_default()
        }
        other => other,
    }
}
