use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{error, info, info_span, warn, Instrument, Span};

use crate::config::ScrapeConfig;
use crate::export::write_csv;
use crate::item::ResultSet;
use crate::parse::{parse_response, Listings};
use crate::request::{request_page, Fetcher, HttpFetcher};
use crate::{info_time, Error, Result};

/// Which collector a run should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Sequential,
    #[default]
    Concurrent,
}

/// Scrapes every term with the chosen collector and writes the results to `output` as CSV.
pub async fn process_terms<S: AsRef<str>>(
    terms: &[S],
    config: ScrapeConfig,
    mode: Mode,
    output: &Path,
) -> Result<ResultSet> {
    let start_time = Local::now();
    info_time!("Started scraping {} terms", terms.len());

    let results = match mode {
        Mode::Sequential => {
            SequentialCollector::new(config)?
                .scrape_search_terms(terms)
                .await?
        }
        Mode::Concurrent => {
            ConcurrentCollector::new(config)?
                .scrape_search_terms(terms)
                .await?
        }
    };
    info_time!(start_time, "Finished scraping, {} items", results.len());

    let local_now = Local::now();
    write_csv(&results, output)?;
    info_time!(local_now, "Wrote the results to file: {}", output.display());

    Ok(results)
}

/// Fetches and parses one term. The fetch includes the request delay.
async fn scrape_search_term<F>(fetcher: &F, term: &str, config: &ScrapeConfig) -> Result<Listings>
where
    F: Fetcher + ?Sized,
{
    let body = request_page(fetcher, term, config).await?;
    parse_response(body, term.to_string()).await
}

fn all_failed(failed: usize, total: usize) -> Result<()> {
    if total > 0 && failed == total {
        return Err(Error::AllTermsFailed(total));
    }
    Ok(())
}

/// Scrapes the terms one after another, results keep the input order.
pub struct SequentialCollector<F = HttpFetcher> {
    fetcher: F,
    config: ScrapeConfig,
    span: Span,
}

impl SequentialCollector<HttpFetcher> {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(fetcher, config))
    }
}

impl<F: Fetcher> SequentialCollector<F> {
    pub fn with_fetcher(fetcher: F, config: ScrapeConfig) -> Self {
        let span = info_span!("scrape_run", mode = "sequential", location = %config.location_id());
        Self {
            fetcher,
            config,
            span,
        }
    }

    /// Replaces the span the run logs under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// A term that fails is logged and contributes nothing, the rest of the run continues.
    /// Errors only if every term failed.
    pub async fn scrape_search_terms<S: AsRef<str>>(&self, terms: &[S]) -> Result<ResultSet> {
        async {
            let mut results = ResultSet::new();
            let mut failed = 0;

            for term in terms {
                let term = term.as_ref();
                info_time!("Scraping term: {term}");

                match scrape_search_term(&self.fetcher, term, &self.config).await {
                    Ok(mut listings) => {
                        let before = results.len();
                        results.extend(listings.by_ref());
                        info!(
                            search_term = term,
                            skipped = listings.skipped(),
                            "Found {} items",
                            results.len() - before
                        );
                    }
                    Err(e) => {
                        failed += 1;
                        error!(search_term = term, error = %e, "Couldn't scrape term");
                    }
                }
            }

            all_failed(failed, terms.len())?;
            Ok::<_, Error>(results)
        }
        .instrument(self.span.clone())
        .await
    }
}

/// Scrapes all terms at once, with at most `max_concurrent_requests` requests in flight.
/// Results come back in completion order.
pub struct ConcurrentCollector<F = HttpFetcher> {
    fetcher: Arc<F>,
    config: Arc<ScrapeConfig>,
    gate: Arc<Semaphore>,
    span: Span,
}

impl ConcurrentCollector<HttpFetcher> {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(fetcher, config))
    }
}

impl<F: Fetcher + 'static> ConcurrentCollector<F> {
    pub fn with_fetcher(fetcher: F, config: ScrapeConfig) -> Self {
        let span = info_span!(
            "scrape_run",
            mode = "concurrent",
            location = %config.location_id(),
            max_concurrent = config.max_concurrent_requests()
        );
        Self {
            fetcher: Arc::new(fetcher),
            gate: Arc::new(Semaphore::new(config.max_concurrent_requests())),
            config: Arc::new(config),
            span,
        }
    }

    /// Replaces the span the run logs under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Spawns one task per term up front. A failing or panicking task is logged and
    /// contributes nothing, it never cancels the others. Errors only if every term failed.
    pub async fn scrape_search_terms<S: AsRef<str>>(&self, terms: &[S]) -> Result<ResultSet> {
        let mut task_set = JoinSet::new();

        for term in terms {
            let term = term.as_ref().to_string();
            let task_span = info_span!(parent: &self.span, "term", search_term = %term);
            task_set.spawn(
                {
                    let fetcher = self.fetcher.clone();
                    let config = self.config.clone();
                    let gate = self.gate.clone();

                    async move {
                        let listings = gated_scrape(fetcher.as_ref(), &term, &config, &gate).await;
                        (term, listings)
                    }
                }
                .instrument(task_span),
            );
        }

        async {
            let mut results = ResultSet::new();
            let mut failed = 0;

            while let Some(task) = task_set.join_next().await {
                match task {
                    Ok((term, Ok(mut listings))) => {
                        let before = results.len();
                        results.extend(listings.by_ref());
                        info!(
                            search_term = %term,
                            skipped = listings.skipped(),
                            "Found {} items",
                            results.len() - before
                        );
                    }
                    Ok((term, Err(e))) => {
                        failed += 1;
                        error!(search_term = %term, error = %e, "Couldn't scrape term");
                    }
                    Err(e) => {
                        failed += 1;
                        warn!(error = %Error::from(e), "Scrape task didn't finish");
                    }
                }
            }

            all_failed(failed, terms.len())?;
            Ok::<_, Error>(results)
        }
        .instrument(self.span.clone())
        .await
    }
}

/// The permit is held for the request and its delay, and released before parsing.
async fn gated_scrape<F>(
    fetcher: &F,
    term: &str,
    config: &ScrapeConfig,
    gate: &Semaphore,
) -> Result<Listings>
where
    F: Fetcher + ?Sized,
{
    let body = {
        let _permit = gate.acquire().await.map_err(|_| Error::GateClosed)?;
        request_page(fetcher, term, config).await
    }?;
    parse_response(body, term.to_string()).await
}
