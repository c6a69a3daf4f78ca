use async_trait::async_trait;
use reqwest::{Client, Url};
use tokio::time::sleep;
use tracing::debug;

use crate::config::ScrapeConfig;
use crate::{Error, Result};

/// Retrieves the raw search results for a single term.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, search_term: &str, location_id: &str) -> Result<String>;
}

/// [`Fetcher`] backed by a `reqwest::Client` hitting the site's search page.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    // Client uses Arc so we can clone cheaply
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    /// Url of the first results page for `search_term` at `location_id`.
    pub fn build_url(&self, search_term: &str, location_id: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("pageId", "1"),
                ("itemSearchKeywords", search_term),
                ("locations", location_id),
            ],
        )
        .map_err(|e| Error::Config(format!("invalid base url {}: {e}", self.base_url)))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, search_term: &str, location_id: &str) -> Result<String> {
        let url = self.build_url(search_term, location_id)?;
        debug!(%url, "requesting search page");

        let res = self.client.get(url.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status,
                url: url.to_string(),
            });
        }
        let html = res.text().await?;
        Ok(html)
    }
}

/// Requests the page for `search_term` and then waits out the configured delay,
/// whether the request succeeded or not.
pub(crate) async fn request_page<F>(
    fetcher: &F,
    search_term: &str,
    config: &ScrapeConfig,
) -> Result<String>
where
    F: Fetcher + ?Sized,
{
    let res = fetcher.fetch(search_term, config.location_id()).await;
    if !config.request_delay().is_zero() {
        sleep(config.request_delay()).await;
    }
    res
}
