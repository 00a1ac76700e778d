use crate::driver::Driver;
use crate::error::{DriverError, ExtractError, FetchError};
use crate::extract::RetryPolicy;
use crate::fetcher::PageFetcher;
use crate::record::{DetailTable, Record};

use std::time::Duration;
use tracing::{debug, warn};

/// Where a source's detail page keeps its secondary data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLayout {
    /// Present once the detail page has rendered.
    pub marker: &'static str,
    pub overview: &'static str,
    pub tables: &'static str,
    pub header_cells: &'static str,
    pub rows: &'static str,
    pub cells: &'static str,
}

pub struct DetailEnricher<'a> {
    layout: &'a DetailLayout,
    fetcher: PageFetcher,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<'a> DetailEnricher<'a> {
    pub fn new(
        layout: &'a DetailLayout,
        fetcher: PageFetcher,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> DetailEnricher<'a> {
        DetailEnricher {
            layout,
            fetcher,
            timeout,
            retry,
        }
    }

    /// Visits the record's detail page and merges its overview and tables.
    /// Returns whether anything was merged. A slow detail page, or one
    /// without tables, leaves the record untouched; only a lost connection
    /// is an error.
    ///
    /// This navigates away from the listing page.
    pub async fn enrich<D: Driver>(
        &self,
        driver: &mut D,
        record: &mut Record,
    ) -> Result<bool, DriverError> {
        match self
            .fetcher
            .load(driver, &record.source_url, self.layout.marker, self.timeout)
            .await
        {
            Ok(()) => {}
            Err(FetchError::Connection { source, .. }) => return Err(source),
            Err(err) => {
                warn!("Detail page for {} unavailable: {}", record.id, err);
                return Ok(false);
            }
        }

        match self.read(driver).await {
            Ok((_, tables)) if tables.is_empty() => {
                debug!("Detail page for {} has no detail tables", record.id);
                Ok(false)
            }
            Ok((overview, tables)) => {
                record.overview = overview;
                record.details = Some(tables);
                Ok(true)
            }
            Err(ExtractError::Driver(err)) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!("Could not read detail page for {}: {}", record.id, err);
                Ok(false)
            }
        }
    }

    async fn read<D: Driver>(
        &self,
        driver: &D,
    ) -> Result<(Option<String>, Vec<DetailTable>), ExtractError> {
        let layout = self.layout;

        let overview = self
            .retry
            .run("overview", || async move {
                match driver.find_all(layout.overview).await?.first() {
                    Some(el) => driver.text(el).await.map(Some),
                    None => Ok(None),
                }
            })
            .await?
            .filter(|text| !text.is_empty());

        let tables = self
            .retry
            .run("details", || async move { driver.find_all(layout.tables).await })
            .await?;

        let mut details = Vec::with_capacity(tables.len());
        for table in &tables {
            let headers = self
                .retry
                .run("details", || async move {
                    texts(driver, &driver.find_within(table, layout.header_cells).await?).await
                })
                .await?;
            if headers.is_empty() {
                continue;
            }

            let rows = self
                .retry
                .run("details", || async move {
                    let mut rows = vec![];
                    for row in driver.find_within(table, layout.rows).await? {
                        rows.push(texts(driver, &driver.find_within(&row, layout.cells).await?).await?);
                    }
                    Ok(rows)
                })
                .await?;

            let mut detail = DetailTable::with_headers(headers.iter().cloned());
            for cells in rows {
                detail.push_row(&headers, cells);
            }
            details.push(detail);
        }

        Ok((overview, details))
    }
}

async fn texts<D: Driver>(driver: &D, elements: &[D::Element]) -> Result<Vec<String>, DriverError> {
    let mut out = Vec::with_capacity(elements.len());
    for el in elements {
        out.push(driver.text(el).await?);
    }
    Ok(out)
}
