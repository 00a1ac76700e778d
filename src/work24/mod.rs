mod listing;

use crate::enrich::DetailLayout;

use lazy_static::lazy_static;
use reqwest::Url;

const E: &str = "Invalid url";
lazy_static! {
    static ref LIST_BASE: Url = Url::parse("https://www.work24.go.kr").expect(E);
    static ref DETAIL_BASE: Url = Url::parse("https://www.work.go.kr").expect(E);
}

const LIST_PATH: &str = "/wk/a/b/1200/retriveDtlEmpSrchList.do";
const DETAIL_PATH: &str = "/empInfo/empInfoSrch/detail/empDetailAuthView.do";

const DETAIL_LAYOUT: DetailLayout = DetailLayout {
    marker: ".careers-table",
    overview: ".careers-table",
    tables: ".careers-table.center",
    header_cells: "thead th",
    rows: "tbody tr",
    cells: "td",
};

/// Work24 (고용24) job search. Pages are numbered from 1 via `pageIndex`.
#[derive(Debug, Clone)]
pub struct Work24 {
    list_base: Url,
    detail_base: Url,
    detail: DetailLayout,
}

impl Default for Work24 {
    fn default() -> Self {
        Self {
            list_base: LIST_BASE.clone(),
            detail_base: DETAIL_BASE.clone(),
            detail: DETAIL_LAYOUT,
        }
    }
}

impl Work24 {
    /// Serves both listing and detail pages from `base`.
    pub fn with_base_url(base: Url) -> Work24 {
        Work24 {
            list_base: base.clone(),
            detail_base: base,
            detail: DETAIL_LAYOUT,
        }
    }

    pub fn detail_url(&self, id: &str) -> String {
        let mut url = self.detail_base.clone();
        url.set_path(DETAIL_PATH);
        url.query_pairs_mut().clear().append_pair("wantedAuthNo", id);
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::DedupTracker;
    use crate::driver::{Driver, HttpDriver, HttpSettings};
    use crate::extract::{extract, Extraction, Lookup, RetryPolicy};
    use crate::{ExtractError, Source, PLACEHOLDER};
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn builds_listing_and_detail_urls() {
        let source = Work24::default();
        assert_eq!(
            source.listing_url("guard", 3),
            "https://www.work24.go.kr/wk/a/b/1200/retriveDtlEmpSrchList.do?srcKeyword=guard&pageIndex=3"
        );
        assert_eq!(
            source.detail_url("K151612410170001"),
            "https://www.work.go.kr/empInfo/empInfoSrch/detail/empDetailAuthView.do?wantedAuthNo=K151612410170001"
        );
        assert_eq!(source.first_page(), 1);
    }

    #[test]
    fn query_is_encoded() {
        let url = Work24::default().listing_url("고령자 경비", 1);
        assert!(url.contains("srcKeyword=%EA%B3%A0%EB%A0%B9%EC%9E%90+%EA%B2%BD%EB%B9%84"));
    }

    #[tokio::test]
    async fn parsing_listing_page() {
        let source = Work24::default();
        let html = fs::read_to_string("tests/htmls/work24_list.html").expect("Invalid file url");
        let mut driver = HttpDriver::new(HttpSettings::default()).unwrap();
        driver.load_html(&source.listing_url("경비", 1), &html);

        assert!(driver.exists(source.ready_selector()).await.unwrap());
        let items = driver.find_all(source.item_selector()).await.unwrap();
        assert_eq!(items.len(), 4);

        let lookup = Lookup::new(&driver, RetryPolicy::default());
        let seen = DedupTracker::new();
        let mut records = vec![];
        let mut failures = vec![];
        for item in &items {
            match extract(&source, &lookup, item, &seen).await {
                Ok(Extraction::New(record)) => records.push(record),
                Ok(Extraction::Duplicate(id)) => panic!("unexpected duplicate {}", id),
                Err(err) => failures.push(err),
            }
        }

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "K151612410170001");
        assert_eq!(records[0].title, "아파트 경비원 모집");
        assert_eq!(records[0].company, "(주)한빛종합관리");
        assert_eq!(records[0].location, "서울 강남구");
        assert_eq!(records[0].salary, "월급 2,300,000원 이상");
        assert_eq!(
            records[0].source_url,
            "https://www.work.go.kr/empInfo/empInfoSrch/detail/empDetailAuthView.do?wantedAuthNo=K151612410170001"
        );
        assert_eq!(records[2].location, PLACEHOLDER);
        assert_eq!(records[2].salary, PLACEHOLDER);

        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            ExtractError::MissingField("job_id")
        ));
    }

    #[tokio::test]
    async fn malformed_value_is_structural() {
        let source = Work24::default();
        let mut driver = HttpDriver::new(HttpSettings::default()).unwrap();
        driver.load_html(
            "https://www.work24.go.kr/list",
            r#"<table id="contentArea"><tbody><tr><td><input value="K1|E"></td></tr></tbody></table>"#,
        );
        let items = driver.find_all(source.item_selector()).await.unwrap();
        let lookup = Lookup::new(&driver, RetryPolicy::default());

        let err = extract(&source, &lookup, &items[0], &DedupTracker::new())
            .await
            .unwrap_err();
        assert!(err.is_structural());
        assert!(matches!(err, ExtractError::Malformed { field: "job_id", .. }));
    }
}
