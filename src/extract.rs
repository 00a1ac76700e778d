use crate::dedup::DedupTracker;
use crate::driver::Driver;
use crate::error::{DriverError, ExtractError};
use crate::record::Record;
use crate::Source;

use std::future::Future;
use tracing::debug;

/// Bounded retry for lookups that race a re-render. Only staleness is
/// retried; attempts follow each other without delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn run<T, F, Fut>(&self, field: &'static str, mut op: F) -> Result<T, ExtractError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DriverError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(DriverError::Stale) if attempt < self.max_attempts => {
                    debug!("`{}` went stale (attempt {}), retrying", field, attempt);
                    attempt += 1;
                }
                Err(DriverError::Stale) => {
                    return Err(ExtractError::Stale {
                        field,
                        attempts: attempt,
                    })
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Field lookups below one listing element, each under the retry policy.
pub struct Lookup<'d, D: Driver> {
    driver: &'d D,
    retry: RetryPolicy,
}

impl<'d, D: Driver> Lookup<'d, D> {
    pub fn new(driver: &'d D, retry: RetryPolicy) -> Lookup<'d, D> {
        Lookup { driver, retry }
    }

    /// Text of the first match of `selector` below `parent`, `None` when
    /// nothing matches.
    pub async fn text(
        &self,
        parent: &D::Element,
        selector: &str,
        field: &'static str,
    ) -> Result<Option<String>, ExtractError> {
        let driver = self.driver;
        self.retry
            .run(field, || async move {
                match driver.find_within(parent, selector).await?.first() {
                    Some(el) => driver.text(el).await.map(Some),
                    None => Ok(None),
                }
            })
            .await
    }

    /// Attribute `name` of the first match of `selector` below `parent`.
    pub async fn attribute(
        &self,
        parent: &D::Element,
        selector: &str,
        name: &str,
        field: &'static str,
    ) -> Result<Option<String>, ExtractError> {
        let driver = self.driver;
        self.retry
            .run(field, || async move {
                match driver.find_within(parent, selector).await?.first() {
                    Some(el) => driver.attribute(el, name).await,
                    None => Ok(None),
                }
            })
            .await
    }

    /// Like [`Lookup::text`] but a missing or unreadable field becomes `None`.
    /// Staleness past the retry bound still fails the record.
    pub async fn optional_text(
        &self,
        parent: &D::Element,
        selector: &str,
        field: &'static str,
    ) -> Result<Option<String>, ExtractError> {
        best_effort(self.text(parent, selector, field).await, field)
    }

    pub async fn optional_attribute(
        &self,
        parent: &D::Element,
        selector: &str,
        name: &str,
        field: &'static str,
    ) -> Result<Option<String>, ExtractError> {
        best_effort(self.attribute(parent, selector, name, field).await, field)
    }
}

fn best_effort(
    result: Result<Option<String>, ExtractError>,
    field: &'static str,
) -> Result<Option<String>, ExtractError> {
    match result {
        Err(ExtractError::Driver(err)) if !err.is_fatal() => {
            debug!("`{}` unavailable: {}", field, err);
            Ok(None)
        }
        other => other,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Extraction {
    New(Record),
    /// The id was already collected earlier in this crawl.
    Duplicate(String),
}

/// Turns one listing element into a record. The identifier is read first and
/// checked against `seen`; `seen` itself is left untouched.
pub async fn extract<S, D>(
    source: &S,
    lookup: &Lookup<'_, D>,
    item: &D::Element,
    seen: &DedupTracker,
) -> Result<Extraction, ExtractError>
where
    S: Source,
    D: Driver,
{
    let id = source.extract_id(lookup, item).await?;
    if !seen.is_new(&id) {
        return Ok(Extraction::Duplicate(id));
    }
    let record = source.extract_fields(lookup, item, id).await?;
    Ok(Extraction::New(record))
}
