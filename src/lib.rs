//! Auction listing scraper.
//! Searches the site for a list of terms, parses the listings out of each results page
//! and exports them as CSV. Terms can be scraped one by one or concurrently behind a gate.

pub mod config;
mod error;
pub mod export;
pub mod item;
mod macros;
pub mod parse;
pub mod process;
pub mod request;

pub use config::ScrapeConfig;
pub use error::{Error, Result};
pub use item::{Amount, Item, ResultSet, TimeRemaining};
pub use process::{process_terms, ConcurrentCollector, Mode, SequentialCollector};
pub use request::{Fetcher, HttpFetcher};
