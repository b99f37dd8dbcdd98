//! Paged fetching from the remote draw-history endpoint.

use super::{DrawResult, FeedSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Page size requested from the remote endpoint.
pub(crate) const PAGE_SIZE: usize = 100;
/// Upper bound on page requests per fetch, in case the remote never runs dry.
pub(crate) const MAX_PAGES: u32 = 40;

const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the paged draw-history endpoint.
///
/// The endpoint serves `GET {base}?page=N&pageSize=100` with a JSON body of
/// the shape `{"data": {"list": [...]}}`. The reqwest client is reused across
/// poll iterations.
pub struct FeedClient {
    client: Client,
    base: Url,
}

impl FeedClient {
    pub fn new(base: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(PAGE_TIMEOUT)
            .build()
            .context("Failed to build feed HTTP client")?;
        Ok(Self { client, base })
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_latest(&self, max_results: usize) -> Result<Vec<DrawResult>> {
        collect_latest(self, max_results).await
    }
}

#[async_trait]
impl PageSource for FeedClient {
    async fn page(&self, page: u32, page_size: usize) -> Result<Vec<DrawResult>> {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &page_size.to_string());

        let resp = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .context("Failed to send feed request")?
            .error_for_status()
            .context("Non-success status from feed endpoint")?;

        let bytes = resp
            .bytes()
            .await
            .context("Failed to read feed response body")?;

        Ok(parse_page(&bytes))
    }
}

/// One page of results, as served by the endpoint.
///
/// A missing or malformed `data.list` counts as an empty page rather than an
/// error, which ends pagination at the accumulation loop.
fn parse_page(body: &[u8]) -> Vec<DrawResult> {
    #[derive(Default, Deserialize)]
    struct HistoryPage {
        #[serde(default)]
        data: PageData,
    }

    #[derive(Default, Deserialize)]
    struct PageData {
        #[serde(default)]
        list: Vec<DrawResult>,
    }

    match serde_json::from_slice::<HistoryPage>(body) {
        Ok(page) => page.data.list,
        Err(e) => {
            debug!("Malformed feed page, treating as empty: {e}");
            Vec::new()
        }
    }
}

/// One page of a paged source. Seam between the accumulation loop and HTTP.
#[async_trait]
pub(crate) trait PageSource: Send + Sync {
    async fn page(&self, page: u32, page_size: usize) -> Result<Vec<DrawResult>>;
}

/// Accumulate pages newest-first until the source runs dry, `max_results` is
/// reached, or [`MAX_PAGES`] requests have been issued.
pub(crate) async fn collect_latest<S>(source: &S, max_results: usize) -> Result<Vec<DrawResult>>
where
    S: PageSource + ?Sized,
{
    let mut results = Vec::new();
    for page in 1..=MAX_PAGES {
        let batch = source.page(page, PAGE_SIZE).await?;
        if batch.is_empty() {
            break;
        }
        results.extend(batch);
        if results.len() >= max_results {
            break;
        }
    }
    results.truncate(max_results);
    Ok(results)
}
