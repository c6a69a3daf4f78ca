use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Network Error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("Request to {url} failed with status {status}")]
    HttpStatus { status: StatusCode, url: String },
    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Couldn't parse the response: {0}")]
    Parse(String),
    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    ParseInvalidSelector(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
    #[error("The concurrency gate was closed.")]
    GateClosed,

    #[error("All {0} search terms failed, nothing was scraped.")]
    AllTermsFailed(usize),
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            let url = value.url().map(|u| u.to_string()).unwrap_or_default();
            return Error::Timeout(url);
        }
        Error::Network(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Parse(format!("invalid JSON payload: {value}"))
    }
}
