pub mod driver;
pub mod indeed;
pub mod sink;
pub mod work24;

mod config;
mod crawler;
mod data;
mod dedup;
mod enrich;
mod error;
mod extract;
mod fetcher;
mod record;
mod utils;

pub use config::CrawlConfig;
pub use crawler::Crawl;
pub use data::Table;
pub use dedup::DedupTracker;
pub use driver::Driver;
pub use enrich::{DetailEnricher, DetailLayout};
pub use error::{CrawlerError, DriverError, ExtractError, FetchError};
pub use extract::{extract, Extraction, Lookup, RetryPolicy};
pub use fetcher::PageFetcher;
pub use record::{
    CrawlResult, CrawlStats, DetailColumn, DetailTable, Record, SourceKind, Termination,
    PLACEHOLDER,
};

/// A job site: how its listing pages are addressed and how one listing
/// element turns into a [`Record`].
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Number of the first listing page.
    fn first_page(&self) -> u32;

    fn listing_url(&self, query: &str, page: u32) -> String;

    /// Present once a listing page has rendered.
    fn ready_selector(&self) -> &str;

    /// One match per posting on a listing page.
    fn item_selector(&self) -> &str;

    /// Sources without a detail page never get enriched.
    fn detail_layout(&self) -> Option<&DetailLayout> {
        None
    }

    /// Reads only the identifier, so duplicates can be skipped before the
    /// rest of the element is touched.
    async fn extract_id<D: Driver>(
        &self,
        lookup: &Lookup<'_, D>,
        item: &D::Element,
    ) -> Result<String, ExtractError>;

    async fn extract_fields<D: Driver>(
        &self,
        lookup: &Lookup<'_, D>,
        item: &D::Element,
        id: String,
    ) -> Result<Record, ExtractError>;
}
