//! Browser sessions.
//!
//! A [`Driver`] owns exactly one navigation state. Element handles returned
//! by it are only meaningful until the next [`Driver::navigate`]; after that
//! every lookup through an old handle fails with [`DriverError::Stale`].

mod chrome;
mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use chrome::ChromeDriver;
pub use http::{HttpDriver, HttpSettings};

use crate::error::DriverError;

#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Whether the current document has at least one match for `selector`.
    async fn exists(&self, selector: &str) -> Result<bool, DriverError>;

    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>, DriverError>;

    async fn find_within(
        &self,
        parent: &Self::Element,
        selector: &str,
    ) -> Result<Vec<Self::Element>, DriverError>;

    async fn text(&self, element: &Self::Element) -> Result<String, DriverError>;

    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    /// Releases the session. Called exactly once when a crawl exits.
    async fn quit(&mut self) -> Result<(), DriverError>;
}
