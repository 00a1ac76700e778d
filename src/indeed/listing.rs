use super::{Indeed, RESULTS_PER_PAGE};
use crate::driver::Driver;
use crate::error::ExtractError;
use crate::extract::Lookup;
use crate::record::{Record, SourceKind};
use crate::Source;

const CARD: &str = ".css-1ac2h1w.eu4oa1w0";
const LINK: &str = "a[data-jk]";
const TITLE: &str = "a[data-jk] span[title]";
const COMPANY: &str = ".company_location.css-i375s1.e37uo190 .css-1h7lukg.eu4oa1w0";
const LOCATION: &str = ".company_location.css-i375s1.e37uo190 .css-1restlb.eu4oa1w0";
const SALARY: &str = ".css-18z4q2i.eu4oa1w0";

#[async_trait::async_trait]
impl Source for Indeed {
    fn kind(&self) -> SourceKind {
        SourceKind::Indeed
    }

    fn first_page(&self) -> u32 {
        0
    }

    fn listing_url(&self, query: &str, page: u32) -> String {
        let mut url = self.base.clone();
        url.set_path("/jobs");
        url.query_pairs_mut()
            .clear()
            .append_pair("q", query)
            .append_pair("start", &(page * RESULTS_PER_PAGE).to_string());
        url.to_string()
    }

    fn ready_selector(&self) -> &str {
        CARD
    }

    fn item_selector(&self) -> &str {
        CARD
    }

    async fn extract_id<D: Driver>(
        &self,
        lookup: &Lookup<'_, D>,
        item: &D::Element,
    ) -> Result<String, ExtractError> {
        match lookup.attribute(item, LINK, "data-jk", "job_id").await? {
            Some(id) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            Some(id) => Err(ExtractError::Malformed {
                field: "job_id",
                value: id,
            }),
            None => Err(ExtractError::MissingField("job_id")),
        }
    }

    async fn extract_fields<D: Driver>(
        &self,
        lookup: &Lookup<'_, D>,
        item: &D::Element,
        id: String,
    ) -> Result<Record, ExtractError> {
        let title = lookup
            .optional_attribute(item, TITLE, "title", "title")
            .await?;
        let company = lookup.optional_text(item, COMPANY, "company").await?;
        let location = lookup.optional_text(item, LOCATION, "location").await?;
        let salary = lookup.optional_text(item, SALARY, "salary").await?;

        let source_url = self.detail_url(&id);
        Ok(Record::new(
            SourceKind::Indeed,
            id,
            source_url,
            title,
            company,
            location,
            salary,
        ))
    }
}
