use crate::extract::RetryPolicy;

use std::time::Duration;

/// Knobs for one crawl instance.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// How long a listing page may take to show its ready marker.
    pub page_timeout: Duration,
    pub detail_timeout: Duration,
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    pub max_pages: Option<u32>,
    pub enrich_details: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(10),
            detail_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            retry: RetryPolicy::default(),
            max_pages: None,
            enrich_details: false,
        }
    }
}

impl CrawlConfig {
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    pub fn with_detail_timeout(mut self, timeout: Duration) -> Self {
        self.detail_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_details(mut self, enrich: bool) -> Self {
        self.enrich_details = enrich;
        self
    }
}
