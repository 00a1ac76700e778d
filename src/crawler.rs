//! The pagination state machine.

use crate::config::CrawlConfig;
use crate::dedup::DedupTracker;
use crate::driver::Driver;
use crate::enrich::{DetailEnricher, DetailLayout};
use crate::error::{CrawlerError, FetchError};
use crate::extract::{extract, Extraction, Lookup};
use crate::fetcher::PageFetcher;
use crate::record::{CrawlResult, CrawlStats, Record, Termination};
use crate::Source;

use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

enum State {
    Fetching,
    Extracting { url: String },
    Accumulating(PageHarvest),
    Deciding(PageHarvest),
    Terminated(Termination),
}

/// What one listing page produced.
struct PageHarvest {
    url: String,
    elements: usize,
    /// Every identifier read on the page, new or already seen.
    ids: HashSet<String>,
    records: Vec<Record>,
    accepted: usize,
}

/// One crawl instance: a source, the session it owns and everything
/// collected so far.
pub struct Crawl<'s, S: Source, D: Driver> {
    source: &'s S,
    driver: D,
    query: String,
    config: CrawlConfig,
    fetcher: PageFetcher,
    cancel: CancellationToken,
    seen: DedupTracker,
    records: Vec<Record>,
    stats: CrawlStats,
    page: u32,
    previous_ids: HashSet<String>,
}

impl<'s, S: Source, D: Driver> Crawl<'s, S, D> {
    pub fn new(source: &'s S, driver: D, query: &str, config: CrawlConfig) -> Self {
        Self {
            source,
            driver,
            query: query.to_string(),
            fetcher: PageFetcher::new(config.poll_interval),
            config,
            cancel: CancellationToken::new(),
            seen: DedupTracker::new(),
            records: vec![],
            stats: CrawlStats::default(),
            page: source.first_page(),
            previous_ids: HashSet::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs until a termination condition fires. The session is released on
    /// every exit path and whatever was collected is always returned.
    pub async fn run(mut self) -> CrawlResult {
        let kind = self.source.kind();
        info!("[{}] Crawl {:?} from page {}", kind, self.query, self.page);

        let mut state = State::Fetching;
        let termination = loop {
            state = match state {
                State::Fetching => self.fetch().await,
                State::Extracting { url } => self.extract_page(url).await,
                State::Accumulating(harvest) => self.accumulate(harvest).await,
                State::Deciding(harvest) => self.decide(harvest),
                State::Terminated(termination) => break termination,
            };
        };

        if let Err(err) = self.driver.quit().await {
            warn!("[{}] Failed to close browser session: {}", kind, err);
        }

        if termination.is_failure() {
            warn!(
                "[{}] Stopped with {} records: {}",
                kind,
                self.records.len(),
                termination
            );
        } else {
            info!(
                "[{}] Finished with {} records: {}",
                kind,
                self.records.len(),
                termination
            );
        }

        CrawlResult {
            source: kind,
            records: self.records,
            stats: self.stats,
            termination,
        }
    }

    async fn fetch(&mut self) -> State {
        let page = self.page;
        if self.cancel.is_cancelled() {
            return State::Terminated(Termination::Cancelled { page });
        }

        let url = self.source.listing_url(&self.query, page);
        match self
            .fetcher
            .load(
                &mut self.driver,
                &url,
                self.source.ready_selector(),
                self.config.page_timeout,
            )
            .await
        {
            Ok(()) => State::Extracting { url },
            Err(err @ FetchError::Timeout { .. }) => {
                warn!("[{}] {}", self.source.kind(), err);
                State::Terminated(Termination::Timeout { page, source: err })
            }
            Err(FetchError::Connection { source, .. }) => State::Terminated(Termination::Failed {
                page,
                source: source.into(),
            }),
        }
    }

    async fn extract_page(&mut self, url: String) -> State {
        let page = self.page;
        let kind = self.source.kind();
        let item_selector = self.source.item_selector();

        let driver = &self.driver;
        let items = match self
            .config
            .retry
            .run("listing", || async move { driver.find_all(item_selector).await })
            .await
        {
            Ok(items) => items,
            Err(err) if err.is_structural() => {
                warn!("[{}] Listing unreadable on page {}: {}", kind, page, err);
                vec![]
            }
            Err(err) => {
                return State::Terminated(Termination::Failed {
                    page,
                    source: err.into(),
                })
            }
        };

        let lookup = Lookup::new(&self.driver, self.config.retry);
        let mut harvest = PageHarvest {
            url,
            elements: items.len(),
            ids: HashSet::new(),
            records: vec![],
            accepted: 0,
        };

        for (idx, item) in items.iter().enumerate() {
            match extract(self.source, &lookup, item, &self.seen).await {
                Ok(Extraction::New(record)) => {
                    self.seen.mark_seen(&record.id);
                    harvest.ids.insert(record.id.clone());
                    harvest.records.push(record);
                    harvest.accepted += 1;
                }
                Ok(Extraction::Duplicate(id)) => {
                    debug!("[{}] Duplicate {} on page {}", kind, id, page);
                    self.stats.duplicates_skipped += 1;
                    harvest.ids.insert(id);
                }
                Err(err) if err.is_structural() => {
                    warn!("[{}] Skip element {} on page {}: {}", kind, idx, page, err);
                    self.stats.structural_failures += 1;
                }
                Err(err) => {
                    // Keep what this page already produced.
                    self.stats.records_collected += harvest.records.len();
                    self.records.append(&mut harvest.records);
                    return State::Terminated(Termination::Failed {
                        page,
                        source: err.into(),
                    });
                }
            }
        }

        State::Accumulating(harvest)
    }

    async fn accumulate(&mut self, mut harvest: PageHarvest) -> State {
        let source = self.source;
        let mut stop = None;
        if self.config.enrich_details && !harvest.records.is_empty() {
            if let Some(layout) = source.detail_layout() {
                stop = self.enrich_page(layout, &mut harvest).await;
            }
        }

        info!(
            "[{}] Page {}: {} new of {} elements",
            source.kind(),
            self.page,
            harvest.accepted,
            harvest.elements
        );
        self.stats.records_collected += harvest.records.len();
        self.records.append(&mut harvest.records);

        match stop {
            Some(termination) => State::Terminated(termination),
            None => State::Deciding(harvest),
        }
    }

    /// Enriches the page's new records, then brings the listing page back.
    async fn enrich_page(
        &mut self,
        layout: &DetailLayout,
        harvest: &mut PageHarvest,
    ) -> Option<Termination> {
        let page = self.page;
        let kind = self.source.kind();
        let enricher = DetailEnricher::new(
            layout,
            self.fetcher,
            self.config.detail_timeout,
            self.config.retry,
        );

        for record in harvest.records.iter_mut() {
            match enricher.enrich(&mut self.driver, record).await {
                Ok(true) => self.stats.details_enriched += 1,
                Ok(false) => {}
                Err(err) => {
                    return Some(Termination::Failed {
                        page,
                        source: CrawlerError::Driver(err),
                    })
                }
            }
        }

        debug!("[{}] Restore listing page {}", kind, page);
        match self
            .fetcher
            .load(
                &mut self.driver,
                &harvest.url,
                self.source.ready_selector(),
                self.config.page_timeout,
            )
            .await
        {
            Ok(()) => None,
            Err(err @ FetchError::Timeout { .. }) => {
                warn!("[{}] {}", kind, err);
                Some(Termination::Timeout { page, source: err })
            }
            Err(FetchError::Connection { source, .. }) => Some(Termination::Failed {
                page,
                source: source.into(),
            }),
        }
    }

    fn decide(&mut self, harvest: PageHarvest) -> State {
        let page = self.page;

        if harvest.elements == 0 {
            return State::Terminated(Termination::EmptyPage { page });
        }
        // Sites past their last page may serve that page again, possibly
        // reordered, instead of an empty one.
        if !harvest.ids.is_empty() && harvest.ids == self.previous_ids {
            return State::Terminated(Termination::LastPage { page });
        }
        if harvest.accepted == 0 {
            return State::Terminated(Termination::NoNewRecords { page });
        }

        self.stats.pages_visited += 1;
        if let Some(max_pages) = self.config.max_pages {
            if self.stats.pages_visited >= max_pages {
                return State::Terminated(Termination::PageLimit { page });
            }
        }

        self.previous_ids = harvest.ids;
        self.page += 1;
        State::Fetching
    }
}
