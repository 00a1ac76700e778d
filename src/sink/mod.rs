//! Where a finished crawl goes. Every sink overwrites what a previous run
//! left behind.

mod json;
mod sqlite;

pub use json::JsonFileSink;
pub use sqlite::{PostingTable, SqliteSink};

use crate::error::CrawlerError;
use crate::record::Record;

#[async_trait::async_trait]
pub trait Sink {
    /// Writes `records` in order and returns how many were written.
    async fn save(&self, records: &[Record]) -> Result<usize, CrawlerError>;
}
