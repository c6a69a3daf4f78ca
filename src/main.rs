use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use lotscrap::{export::summary_table, info_time, process_terms, Mode, Result, ScrapeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lotscrap")]
#[command(about = "Scrape auction listings for a set of search terms into a CSV file")]
#[command(version)]
struct Cli {
    /// Terms to search for
    #[arg(required = true)]
    terms: Vec<String>,

    /// Location id the search is restricted to
    #[arg(short, long, default_value = lotscrap::config::DEFAULT_LOCATION_ID)]
    location: String,

    /// Seconds to wait after every request (default: 2 sequential, 0.5 concurrent)
    #[arg(short, long)]
    delay: Option<f64>,

    /// Maximum number of requests in flight at once
    #[arg(short, long, default_value_t = lotscrap::config::DEFAULT_MAX_CONCURRENT_REQUESTS)]
    max_concurrent: usize,

    /// Scrape the terms one after another
    #[arg(short, long)]
    sequential: bool,

    /// Where to write the CSV
    #[arg(short, long, default_value = "results.csv")]
    output: PathBuf,

    /// Search page to query
    #[arg(long, default_value = lotscrap::config::DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lotscrap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let start_time = Local::now();

    let mode = if cli.sequential {
        Mode::Sequential
    } else {
        Mode::Concurrent
    };
    let default_delay = match mode {
        Mode::Sequential => ScrapeConfig::sequential().request_delay(),
        Mode::Concurrent => ScrapeConfig::concurrent().request_delay(),
    };
    let config = ScrapeConfig::builder()
        .base_url(cli.base_url)
        .location_id(cli.location)
        .request_delay_secs(cli.delay.unwrap_or(default_delay.as_secs_f64()))
        .max_concurrent_requests(cli.max_concurrent)
        .build()?;

    let results = process_terms(cli.terms.as_slice(), config, mode, &cli.output).await?;
    println!("{}", summary_table(&results));
    info_time!(start_time, "Full program time:");

    Ok(())
}
