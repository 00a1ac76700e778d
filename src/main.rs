use clap::{Parser, ValueEnum};
use futures::future::join_all;
use job_posting_crawler::driver::{ChromeDriver, HttpDriver, HttpSettings};
use job_posting_crawler::indeed::Indeed;
use job_posting_crawler::sink::{JsonFileSink, Sink, SqliteSink};
use job_posting_crawler::work24::Work24;
use job_posting_crawler::{
    Crawl, CrawlConfig, CrawlResult, CrawlerError, Driver, RetryPolicy, SourceKind,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Sites {
    Work24,
    Indeed,
    All,
}

impl Sites {
    fn kinds(self) -> Vec<SourceKind> {
        match self {
            Sites::Work24 => vec![SourceKind::Work24],
            Sites::Indeed => vec![SourceKind::Indeed],
            Sites::All => vec![SourceKind::Work24, SourceKind::Indeed],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DriverKind {
    Chrome,
    Http,
}

/// Collects job postings matching a query from Work24 and Indeed Korea.
#[derive(Debug, Parser)]
#[command(name = "job-posting-crawler", version)]
struct Args {
    /// Search keyword
    query: String,

    #[arg(short, long, value_enum, default_value_t = Sites::All)]
    source: Sites,

    /// JSON output file
    #[arg(short, long, default_value = "jobs.json")]
    output: PathBuf,

    /// Also store results in `<NAME>.db`
    #[arg(long, value_name = "NAME")]
    sqlite: Option<String>,

    #[arg(long, value_enum, default_value_t = DriverKind::Chrome)]
    driver: DriverKind,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Visit each posting's detail page
    #[arg(long)]
    details: bool,

    #[arg(long)]
    max_pages: Option<u32>,

    /// Seconds to wait for a listing page
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Seconds to wait for a detail page
    #[arg(long, default_value_t = 10)]
    detail_timeout_secs: u64,

    /// Attempts per lookup when the page re-renders under it
    #[arg(long, default_value_t = 3)]
    retries: u32,
}

impl Args {
    fn config(&self) -> CrawlConfig {
        let config = CrawlConfig::default()
            .with_page_timeout(Duration::from_secs(self.timeout_secs))
            .with_detail_timeout(Duration::from_secs(self.detail_timeout_secs))
            .with_retry(RetryPolicy::new(self.retries))
            .with_details(self.details);
        match self.max_pages {
            Some(max_pages) => config.with_max_pages(max_pages),
            None => config,
        }
    }
}

async fn crawl_source<D: Driver>(
    kind: SourceKind,
    driver: D,
    query: &str,
    config: CrawlConfig,
    cancel: CancellationToken,
) -> CrawlResult {
    match kind {
        SourceKind::Work24 => {
            let source = Work24::default();
            Crawl::new(&source, driver, query, config)
                .with_cancellation(cancel)
                .run()
                .await
        }
        SourceKind::Indeed => {
            let source = Indeed::default();
            Crawl::new(&source, driver, query, config)
                .with_cancellation(cancel)
                .run()
                .await
        }
    }
}

async fn run_source(
    kind: SourceKind,
    args: &Args,
    cancel: CancellationToken,
) -> Result<CrawlResult, CrawlerError> {
    let config = args.config();
    let result = match args.driver {
        DriverKind::Http => {
            let driver = HttpDriver::new(HttpSettings::default())?;
            crawl_source(kind, driver, &args.query, config, cancel).await
        }
        DriverKind::Chrome => {
            let driver = ChromeDriver::launch(!args.headful).await?;
            crawl_source(kind, driver, &args.query, config, cancel).await
        }
    };
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn,chromiumoxide=warn"
                    .into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current page");
            on_signal.cancel();
        }
    });

    let kinds = args.source.kinds();
    let runs = join_all(
        kinds
            .iter()
            .map(|kind| run_source(*kind, &args, cancel.clone())),
    )
    .await;

    let mut records = vec![];
    let mut failed = false;
    for (kind, run) in kinds.iter().zip(runs) {
        match run {
            Ok(mut result) => {
                info!(
                    "[{}] {} records, {} pages, {} duplicates, {} skipped, {} enriched: {}",
                    kind,
                    result.stats.records_collected,
                    result.stats.pages_visited,
                    result.stats.duplicates_skipped,
                    result.stats.structural_failures,
                    result.stats.details_enriched,
                    result.termination
                );
                failed |= result.termination.is_failure();
                records.append(&mut result.records);
            }
            Err(err) => {
                error!("[{}] Could not start: {}", kind, err);
                failed = true;
            }
        }
    }

    JsonFileSink::new(&args.output).save(&records).await?;
    if let Some(name) = &args.sqlite {
        SqliteSink::new(name).await?.save(&records).await?;
    }

    if failed {
        return Err("one or more crawls failed; partial results were saved".into());
    }
    Ok(())
}
