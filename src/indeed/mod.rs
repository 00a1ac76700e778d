mod listing;

use lazy_static::lazy_static;
use reqwest::Url;

const E: &str = "Invalid url";
lazy_static! {
    static ref BASE: Url = Url::parse("https://kr.indeed.com").expect(E);
}

const RESULTS_PER_PAGE: u32 = 10;

/// Indeed Korea search results. Pages are numbered from 0 and addressed by
/// result offset (`start = page * 10`).
#[derive(Debug, Clone)]
pub struct Indeed {
    base: Url,
}

impl Default for Indeed {
    fn default() -> Self {
        Self { base: BASE.clone() }
    }
}

impl Indeed {
    pub fn with_base_url(base: Url) -> Indeed {
        Indeed { base }
    }

    pub fn detail_url(&self, id: &str) -> String {
        let mut url = self.base.clone();
        url.set_path("/viewjob");
        url.query_pairs_mut().clear().append_pair("jk", id);
        url.to_string()
    }
}
