use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.bidfta.com/items";
pub const DEFAULT_LOCATION_ID: &str = "616";
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;
pub const DEFAULT_SEQUENTIAL_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_CONCURRENT_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Settings shared by both collectors. Built either from the defaults or through
/// [`ScrapeConfigBuilder`], so every instance is valid.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    base_url: String,
    location_id: String,
    request_delay: Duration,
    max_concurrent_requests: usize,
    timeout: Duration,
    user_agent: String,
}

impl ScrapeConfig {
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder::default()
    }

    /// Defaults used by the sequential collector.
    pub fn sequential() -> Self {
        Self::with_delay(DEFAULT_SEQUENTIAL_DELAY)
    }

    /// Defaults used by the concurrent collector.
    pub fn concurrent() -> Self {
        Self::with_delay(DEFAULT_CONCURRENT_DELAY)
    }

    fn with_delay(request_delay: Duration) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            location_id: DEFAULT_LOCATION_ID.into(),
            request_delay,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeConfigBuilder {
    base_url: String,
    location_id: String,
    request_delay: Duration,
    request_delay_secs: Option<f64>,
    max_concurrent_requests: usize,
    timeout: Duration,
    user_agent: String,
}

impl Default for ScrapeConfigBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            location_id: DEFAULT_LOCATION_ID.into(),
            request_delay: DEFAULT_SEQUENTIAL_DELAY,
            request_delay_secs: None,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl ScrapeConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn location_id(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = location_id.into();
        self
    }

    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self.request_delay_secs = None;
        self
    }

    /// Delay given in (fractional) seconds, as it usually comes from the command line.
    /// Checked in [`ScrapeConfigBuilder::build`].
    pub fn request_delay_secs(mut self, secs: f64) -> Self {
        self.request_delay_secs = Some(secs);
        self
    }

    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<ScrapeConfig> {
        let request_delay = match self.request_delay_secs {
            Some(secs) if !secs.is_finite() || secs < 0.0 => {
                return Err(Error::Config(format!(
                    "request delay must be a non-negative number of seconds, got {secs}"
                )));
            }
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|e| Error::Config(format!("invalid request delay {secs}: {e}")))?,
            None => self.request_delay,
        };
        if self.max_concurrent_requests == 0
            || self.max_concurrent_requests > tokio::sync::Semaphore::MAX_PERMITS
        {
            return Err(Error::Config(format!(
                "max concurrent requests must be between 1 and {}, got {}",
                tokio::sync::Semaphore::MAX_PERMITS,
                self.max_concurrent_requests
            )));
        }
        if self.location_id.trim().is_empty() {
            return Err(Error::Config("location id can't be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".into()));
        }
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base url {}: {e}", self.base_url)))?;

        Ok(ScrapeConfig {
            base_url: self.base_url,
            location_id: self.location_id,
            request_delay,
            max_concurrent_requests: self.max_concurrent_requests,
            timeout: self.timeout,
            user_agent: self.user_agent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let seq = ScrapeConfig::sequential();
        assert_eq!(seq.location_id(), "616");
        assert_eq!(seq.request_delay(), Duration::from_secs(2));

        let conc = ScrapeConfig::concurrent();
        assert_eq!(conc.request_delay(), Duration::from_millis(500));
        assert_eq!(conc.max_concurrent_requests(), 5);
    }

    #[test]
    fn delay_in_seconds() {
        let config = ScrapeConfig::builder()
            .request_delay_secs(0.25)
            .build()
            .unwrap();
        assert_eq!(config.request_delay(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_negative_delay() {
        let err = ScrapeConfig::builder()
            .request_delay_secs(-1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = ScrapeConfig::builder()
            .request_delay_secs(f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_delay_too_large_for_duration() {
        let err = ScrapeConfig::builder()
            .request_delay_secs(1e20)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = ScrapeConfig::builder()
            .max_concurrent_requests(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = ScrapeConfig::builder()
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
