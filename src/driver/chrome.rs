use super::Driver;
use crate::error::DriverError;
use crate::utils::normalize_whitespace;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A Chromium session driven over the DevTools protocol.
/// Every session gets its own throwaway profile, removed on drop.
pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler: Option<JoinHandle<()>>,
    profile: TempDir,
}

impl ChromeDriver {
    pub async fn launch(headless: bool) -> Result<ChromeDriver, DriverError> {
        let profile = profile_dir()?;
        let mut builder = BrowserConfig::builder().user_data_dir(profile.path());
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(DriverError::Connection)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(map_cdp_error)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(map_cdp_error)?;
        debug!("Browser session started in {}", profile.path().display());

        Ok(ChromeDriver {
            browser,
            page,
            handler: Some(handler),
            profile,
        })
    }
}

fn profile_dir() -> Result<TempDir, DriverError> {
    tempfile::Builder::new()
        .prefix("job-posting-crawler-")
        .tempdir()
        .map_err(|err| DriverError::Connection(format!("no browser profile directory: {}", err)))
}

fn map_cdp_error(err: CdpError) -> DriverError {
    let message = err.to_string();
    match err {
        CdpError::Ws(_) | CdpError::Io(_) | CdpError::NoResponse => {
            DriverError::Connection(message)
        }
        CdpError::Timeout => DriverError::Timeout(message),
        _ if is_stale_message(&message) => DriverError::Stale,
        _ => DriverError::Protocol(message),
    }
}

// Chromium reports a detached node through these messages.
fn is_stale_message(message: &str) -> bool {
    [
        "Could not find node with given id",
        "No node with given id found",
        "Node with given id does not belong to the document",
        "Cannot find context with specified id",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}

#[async_trait::async_trait]
impl Driver for ChromeDriver {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        debug!("Visit {}", url);
        self.page.goto(url).await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool, DriverError> {
        Ok(!self.find_all(selector).await?.is_empty())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Element>, DriverError> {
        self.page
            .find_elements(selector)
            .await
            .map_err(map_cdp_error)
    }

    async fn find_within(
        &self,
        parent: &Element,
        selector: &str,
    ) -> Result<Vec<Element>, DriverError> {
        parent.find_elements(selector).await.map_err(map_cdp_error)
    }

    async fn text(&self, element: &Element) -> Result<String, DriverError> {
        let text = element.inner_text().await.map_err(map_cdp_error)?;
        Ok(normalize_whitespace(text.as_deref().unwrap_or_default()))
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, DriverError> {
        element.attribute(name).await.map_err(map_cdp_error)
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        let closed = self.browser.close().await.map_err(map_cdp_error);
        if let Err(err) = self.browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", err);
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        debug!("Browser session {} closed", self.profile.path().display());
        closed.map(|_| ())
    }
}
