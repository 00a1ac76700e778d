use crate::driver::Driver;
use crate::error::{DriverError, FetchError};

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Navigates a session and blocks until the page is ready.
#[derive(Debug, Clone, Copy)]
pub struct PageFetcher {
    pub poll_interval: Duration,
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl PageFetcher {
    pub fn new(poll_interval: Duration) -> PageFetcher {
        PageFetcher { poll_interval }
    }

    /// Loads `url` and waits until `ready_selector` is present. `timeout`
    /// bounds navigation and polling together. Only a lost connection is
    /// reported as [`FetchError::Connection`]; every other way of not
    /// becoming ready is a timeout.
    pub async fn load<D: Driver>(
        &self,
        driver: &mut D,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<(), FetchError> {
        let started = Instant::now();
        let timed_out = || FetchError::Timeout {
            url: url.to_string(),
            selector: ready_selector.to_string(),
            waited: started.elapsed(),
        };

        match tokio::time::timeout(timeout, self.wait_ready(driver, url, ready_selector)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(timed_out()),
            Ok(Err(source)) => Err(FetchError::Connection {
                url: url.to_string(),
                source,
            }),
            Err(_) => {
                debug!("Gave up on {} after {:?}", url, started.elapsed());
                Err(timed_out())
            }
        }
    }

    /// `Ok(false)` when navigation failed without losing the connection.
    async fn wait_ready<D: Driver>(
        &self,
        driver: &mut D,
        url: &str,
        ready_selector: &str,
    ) -> Result<bool, DriverError> {
        match driver.navigate(url).await {
            Ok(()) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!("Navigation to {} failed: {}", url, err);
                return Ok(false);
            }
        }

        loop {
            match driver.exists(ready_selector).await {
                Ok(true) => return Ok(true),
                Ok(false) | Err(DriverError::Stale) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => debug!("Waiting for `{}` on {}: {}", ready_selector, url, err),
            }
            sleep(self.poll_interval).await;
        }
    }
}
