use super::Work24;
use crate::driver::Driver;
use crate::enrich::DetailLayout;
use crate::error::ExtractError;
use crate::extract::Lookup;
use crate::record::{Record, SourceKind};
use crate::Source;

const READY: &str = "#contentArea";
const ITEM: &str = "#contentArea > tbody > tr";
const VALUE: &str = "input";
const LOCATION: &str = ".site";
const SALARY: &str = ".b1_sb";

// The row's input value is `id|?|company|title|...`.
const ID_PART: usize = 0;
const COMPANY_PART: usize = 2;
const TITLE_PART: usize = 3;

async fn read_value<D: Driver>(
    lookup: &Lookup<'_, D>,
    item: &D::Element,
) -> Result<Vec<String>, ExtractError> {
    let value = lookup
        .attribute(item, VALUE, "value", "job_id")
        .await?
        .ok_or(ExtractError::MissingField("job_id"))?;

    let parts = value
        .split('|')
        .map(|s| s.trim().to_string())
        .collect::<Vec<_>>();
    if parts.len() <= TITLE_PART || parts[ID_PART].is_empty() {
        return Err(ExtractError::Malformed {
            field: "job_id",
            value,
        });
    }
    Ok(parts)
}

#[async_trait::async_trait]
impl Source for Work24 {
    fn kind(&self) -> SourceKind {
        SourceKind::Work24
    }

    fn first_page(&self) -> u32 {
        1
    }

    fn listing_url(&self, query: &str, page: u32) -> String {
        let mut url = self.list_base.clone();
        url.set_path(super::LIST_PATH);
        url.query_pairs_mut()
            .clear()
            .append_pair("srcKeyword", query)
            .append_pair("pageIndex", &page.to_string());
        url.to_string()
    }

    fn ready_selector(&self) -> &str {
        READY
    }

    fn item_selector(&self) -> &str {
        ITEM
    }

    fn detail_layout(&self) -> Option<&DetailLayout> {
        Some(&self.detail)
    }

    async fn extract_id<D: Driver>(
        &self,
        lookup: &Lookup<'_, D>,
        item: &D::Element,
    ) -> Result<String, ExtractError> {
        let mut parts = read_value(lookup, item).await?;
        Ok(parts.swap_remove(ID_PART))
    }

    async fn extract_fields<D: Driver>(
        &self,
        lookup: &Lookup<'_, D>,
        item: &D::Element,
        id: String,
    ) -> Result<Record, ExtractError> {
        let mut parts = read_value(lookup, item).await?;
        let title = std::mem::take(&mut parts[TITLE_PART]);
        let company = std::mem::take(&mut parts[COMPANY_PART]);

        let location = lookup.optional_text(item, LOCATION, "location").await?;
        let salary = lookup.optional_text(item, SALARY, "salary").await?;

        let source_url = self.detail_url(&id);
        Ok(Record::new(
            SourceKind::Work24,
            id,
            source_url,
            Some(title),
            Some(company),
            location,
            salary,
        ))
    }
}
