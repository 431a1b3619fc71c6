use std::time::Duration;

use async_trait::async_trait;

use super::{build_http_client, get_json, UpstreamClient};
use crate::error::{AppError, Result};
use crate::types::PageEnvelope;

/// Primary results/standings provider (Ergast-compatible API).
pub struct JolpicaClient {
    http: reqwest::Client,
    base_url: String,
}

impl JolpicaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl UpstreamClient for JolpicaClient {
    fn name(&self) -> &'static str {
        "jolpica"
    }

    async fn fetch(
        &self,
        path: &str,
        data_key: &str,
        limit: u32,
        offset: u32,
    ) -> Result<PageEnvelope<serde_json::Value>> {
        let url = format!("{}/{}.json?limit={}&offset={}", self.base_url, path, limit, offset);
        let body = get_json(&self.http, &url).await?;
        unwrap_mrdata(body, data_key)
    }
}

/// Pull `<data_key>Table` and the string-typed paging fields out of `MRData`.
pub fn unwrap_mrdata(body: serde_json::Value, data_key: &str) -> Result<PageEnvelope<serde_json::Value>> {
    let mut mr = match body {
        serde_json::Value::Object(mut root) => match root.remove("MRData") {
            Some(serde_json::Value::Object(mr)) => mr,
            _ => return Err(AppError::Malformed("response has no MRData object".to_string())),
        },
        _ => return Err(AppError::Malformed("response is not a JSON object".to_string())),
    };

    let total = paging_field(&mr, "total")?;
    let limit = paging_field(&mr, "limit")?;
    let offset = paging_field(&mr, "offset")?;

    let table_key = format!("{data_key}Table");
    let data = mr
        .remove(&table_key)
        .ok_or_else(|| AppError::Malformed(format!("MRData has no {table_key}")))?;

    Ok(PageEnvelope { data, total, limit, offset })
}

fn paging_field(mr: &serde_json::Map<String, serde_json::Value>, key: &str) -> Result<u32> {
    let v = mr
        .get(key)
        .ok_or_else(|| AppError::Malformed(format!("MRData has no {key}")))?;
    v.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| AppError::Malformed(format!("MRData.{key} is not a number: {v}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_table_and_string_paging() {
        let body = json!({
            "MRData": {
                "limit": "30", "offset": "60", "total": "1532",
                "RaceTable": { "season": "2024", "Races": [] }
            }
        });
        let page = unwrap_mrdata(body, "Race").unwrap();
        assert_eq!(page.total, 1532);
        assert_eq!(page.limit, 30);
        assert_eq!(page.offset, 60);
        assert_eq!(page.data["season"], "2024");
    }

    #[test]
    fn missing_table_is_malformed() {
        let body = json!({ "MRData": { "limit": "30", "offset": "0", "total": "0" } });
        let err = unwrap_mrdata(body, "Standings").unwrap_err();
        assert!(matches!(err, AppError::Malformed(_)));
    }

    #[test]
    fn non_numeric_total_is_malformed() {
        let body = json!({ "MRData": { "limit": "30", "offset": "0", "total": "many", "RaceTable": {} } });
        assert!(matches!(unwrap_mrdata(body, "Race"), Err(AppError::Malformed(_))));
    }

    #[test]
    fn total_beyond_u32_is_malformed() {
        let body = json!({ "MRData": { "limit": 30, "offset": 0, "total": 4_294_967_296u64, "RaceTable": {} } });
        assert!(matches!(unwrap_mrdata(body, "Race"), Err(AppError::Malformed(_))));
    }
}
