use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::UpstreamClient;
use crate::error::Result;
use crate::types::PageEnvelope;

type Handler = Box<dyn Fn(&str, u32, u32) -> Result<PageEnvelope<serde_json::Value>> + Send + Sync>;

/// Scripted provider: answers each request from a closure and records what
/// was asked, how many requests overlapped, and in which order.
pub struct MockUpstream {
    handler: Handler,
    latency: Duration,
    calls: Mutex<Vec<(String, u32, u32)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockUpstream {
    pub fn new(
        handler: impl Fn(&str, u32, u32) -> Result<PageEnvelope<serde_json::Value>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<(String, u32, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch(
        &self,
        path: &str,
        _data_key: &str,
        limit: u32,
        offset: u32,
    ) -> Result<PageEnvelope<serde_json::Value>> {
        self.calls.lock().unwrap().push((path.to_string(), limit, offset));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = (self.handler)(path, limit, offset);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Envelope helper for scripted responses.
pub fn page(data: serde_json::Value, total: u32, limit: u32, offset: u32) -> PageEnvelope<serde_json::Value> {
    PageEnvelope { data, total, limit, offset }
}
