use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CrawlerError {
    #[error("Database error")]
    DatabaseError(#[from] sqlx::error::Error),

    #[error("Browser session error: {0}")]
    Driver(#[from] DriverError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

/// Failures reported by a browser session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The element handle belongs to a document that has since been replaced.
    #[error("stale element reference")]
    Stale,

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection lost: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Connection(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("`{selector}` did not appear on {url} within {waited:?}")]
    Timeout {
        url: String,
        selector: String,
        waited: Duration,
    },

    #[error("connection failure while loading {url}: {source}")]
    Connection { url: String, source: DriverError },
}

/// Per-record extraction failures. Everything except a lost connection is
/// structural: the record is skipped and the page carries on.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("field `{field}` is malformed: {value:?}")]
    Malformed { field: &'static str, value: String },

    #[error("field `{field}` stayed stale after {attempts} attempts")]
    Stale { field: &'static str, attempts: u32 },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ExtractError {
    pub fn is_structural(&self) -> bool {
        match self {
            ExtractError::Driver(err) => !err.is_fatal(),
            _ => true,
        }
    }
}
