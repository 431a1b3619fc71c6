//! Upstream data providers.
//!
//! Every provider is reached through [`UpstreamClient`], which returns one
//! bounded page normalised into a [`PageEnvelope`]. Providers never retry.

pub mod dhl;
pub mod jolpica;
#[cfg(test)]
pub mod mock;
pub mod openf1;
pub mod schema;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::PageEnvelope;

pub use dhl::DhlClient;
pub use jolpica::JolpicaClient;
pub use openf1::OpenF1Client;

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch a single page of `path`. Providers without a keyed envelope
    /// ignore `data_key`; providers without paging ignore `limit`/`offset`.
    async fn fetch(
        &self,
        path: &str,
        data_key: &str,
        limit: u32,
        offset: u32,
    ) -> Result<PageEnvelope<serde_json::Value>>;
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// GET `url` and parse the body as JSON.
///
/// Non-2xx → `Upstream`, network failure or deadline → `Transport`,
/// undecodable body → `Malformed`.
pub(crate) async fn get_json(client: &reqwest::Client, url: &str) -> Result<serde_json::Value> {
    debug!(url = %url, "upstream GET");
    let resp = client
        .get(url)
        .header("Content-Type", "application/json")
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let message = status.canonical_reason().unwrap_or("request failed").to_string();
        return Err(AppError::Upstream { status: status.as_u16(), message });
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| AppError::malformed(url, e))
}
