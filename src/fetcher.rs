use std::future::Future;
use std::time::Duration;

use futures_util::future::try_join_all;
use tracing::debug;

use crate::config::{DEFAULT_DELAY_STEP_MS, DEFAULT_FETCH_CONCURRENCY, DEFAULT_PAGE_SIZE};
use crate::error::Result;
use crate::types::PageEnvelope;
use crate::upstream::UpstreamClient;

/// Reconstructs a complete paginated dataset from an upstream that only
/// serves bounded pages.
///
/// Offsets are split into consecutive groups of at most `concurrency`
/// requests. A group runs concurrently; the next group starts only once
/// every request of the current one has completed. Within a group, slot `i`
/// waits `i * delay_step` before dispatching, so bursts reach the upstream
/// staggered.
#[derive(Debug, Clone)]
pub struct BatchFetcher {
    page_size: u32,
    concurrency: usize,
    delay_step: Duration,
}

impl Default for BatchFetcher {
    fn default() -> Self {
        Self::new(
            DEFAULT_PAGE_SIZE,
            DEFAULT_FETCH_CONCURRENCY,
            Duration::from_millis(DEFAULT_DELAY_STEP_MS),
        )
    }
}

impl BatchFetcher {
    pub fn new(page_size: u32, concurrency: usize, delay_step: Duration) -> Self {
        Self {
            page_size: page_size.max(1),
            concurrency: concurrency.max(1),
            delay_step,
        }
    }

    /// Offsets of the `ceil(total / page_size)` pages covering `total` records.
    pub fn page_offsets(&self, total: u32) -> Vec<u32> {
        (0..total.div_ceil(self.page_size))
            .map(|i| i * self.page_size)
            .collect()
    }

    /// Fetch every page of `path`. Pages come back in offset order regardless
    /// of completion order. The first failing request aborts the whole call;
    /// nothing is retried and no partial result is returned.
    pub async fn fetch_all<C>(
        &self,
        client: &C,
        path: &str,
        data_key: &str,
        total: u32,
    ) -> Result<Vec<PageEnvelope<serde_json::Value>>>
    where
        C: UpstreamClient + ?Sized,
    {
        self.fetch_offsets(client, path, data_key, self.page_offsets(total)).await
    }

    /// Like [`fetch_all`](Self::fetch_all) when the page at offset 0 was
    /// already fetched at this page size: only the remaining pages are
    /// requested, and `first` leads the result.
    pub async fn fetch_rest<C>(
        &self,
        client: &C,
        path: &str,
        data_key: &str,
        first: PageEnvelope<serde_json::Value>,
    ) -> Result<Vec<PageEnvelope<serde_json::Value>>>
    where
        C: UpstreamClient + ?Sized,
    {
        let offsets: Vec<u32> = self.page_offsets(first.total).into_iter().skip(1).collect();
        let rest = self.fetch_offsets(client, path, data_key, offsets).await?;

        let mut pages = Vec::with_capacity(rest.len() + 1);
        pages.push(first);
        pages.extend(rest);
        Ok(pages)
    }

    async fn fetch_offsets<C>(
        &self,
        client: &C,
        path: &str,
        data_key: &str,
        offsets: Vec<u32>,
    ) -> Result<Vec<PageEnvelope<serde_json::Value>>>
    where
        C: UpstreamClient + ?Sized,
    {
        if offsets.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            provider = client.name(),
            path = %path,
            pages = offsets.len(),
            first_offset = offsets[0],
            page_size = self.page_size,
            "batch fetch starting"
        );

        let page_size = self.page_size;
        run_staggered(offsets, self.concurrency, self.delay_step, move |offset| {
            client.fetch(path, data_key, page_size, offset)
        })
        .await
    }
}

/// Run `task` over `items` in consecutive groups of `width`, staggering each
/// slot's start by `slot * step`. Output order matches input order.
pub async fn run_staggered<T, R, F, Fut>(
    items: Vec<T>,
    width: usize,
    step: Duration,
    task: F,
) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let width = width.max(1);
    let mut out = Vec::with_capacity(items.len());
    let mut remaining = items.into_iter().peekable();
    let mut group = 0usize;

    while remaining.peek().is_some() {
        let batch = remaining.by_ref().take(width).enumerate().map(|(slot, item)| {
            let delay = step * slot as u32;
            let fut = task(item);
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                fut.await
            }
        });

        let results = try_join_all(batch).await?;
        debug!(group, completed = results.len(), "batch group complete");
        out.extend(results);
        group += 1;
    }

    Ok(out)
}
