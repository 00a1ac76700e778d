use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

use crate::error::{CrawlerError, FetchError};

/// Stand-in for any field a listing did not provide.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceKind {
    Work24,
    Indeed,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Work24 => "Work24",
            SourceKind::Indeed => "Indeed",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    #[serde(rename = "job_id")]
    pub id: String,
    #[serde(rename = "link")]
    pub source_url: String,
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<DetailTable>>,
}

impl Record {
    /// Builds a record, mapping every absent or blank field to [`PLACEHOLDER`].
    pub fn new(
        source: SourceKind,
        id: String,
        source_url: String,
        title: Option<String>,
        company: Option<String>,
        location: Option<String>,
        salary: Option<String>,
    ) -> Record {
        Record {
            title: or_placeholder(title),
            company: or_placeholder(company),
            location: or_placeholder(location),
            salary: or_placeholder(salary),
            id,
            source_url,
            source,
            overview: None,
            details: None,
        }
    }
}

fn or_placeholder(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Job Id          : {} ({})", self.id, self.source)?;
        writeln!(f, "Title           : {}", self.title)?;
        writeln!(f, "Company         : {}", self.company)?;
        writeln!(f, "Location        : {}", self.location)?;
        writeln!(f, "Salary          : {}", self.salary)?;
        writeln!(f, "Link            : {}", self.source_url)?;
        if let Some(tables) = self.details.as_ref() {
            writeln!(f, "Detail tables   : {}", tables.len())?;
        }
        Ok(())
    }
}

/// A secondary table from a detail page. Columns keep page order and
/// serialize as a JSON object of header to cell list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailTable {
    pub columns: Vec<DetailColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailColumn {
    pub header: String,
    pub cells: Vec<String>,
}

impl DetailTable {
    pub fn with_headers<I: IntoIterator<Item = String>>(headers: I) -> DetailTable {
        let mut table = DetailTable::default();
        for header in headers {
            table.column_index(header);
        }
        table
    }

    /// Appends one body row. Cells beyond the header count are dropped.
    pub fn push_row(&mut self, headers: &[String], cells: Vec<String>) {
        for (header, cell) in headers.iter().zip(cells) {
            let idx = self.column_index(header.clone());
            self.columns[idx].cells.push(cell);
        }
    }

    pub fn column(&self, header: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|c| c.header == header)
            .map(|c| c.cells.as_slice())
    }

    // Repeated headers share one column.
    fn column_index(&mut self, header: String) -> usize {
        match self.columns.iter().position(|c| c.header == header) {
            Some(idx) => idx,
            None => {
                self.columns.push(DetailColumn {
                    header,
                    cells: vec![],
                });
                self.columns.len() - 1
            }
        }
    }
}

impl Serialize for DetailTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in &self.columns {
            map.serialize_entry(&column.header, &column.cells)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Listing pages whose records were accumulated.
    pub pages_visited: u32,
    pub records_collected: usize,
    pub duplicates_skipped: usize,
    pub structural_failures: usize,
    pub details_enriched: usize,
}

/// Why a crawl stopped. `page` is the page index being processed at the time.
#[derive(Debug, thiserror::Error)]
pub enum Termination {
    #[error("empty page reached (page {page})")]
    EmptyPage { page: u32 },

    #[error("last page reached (page {page} repeats the previous page)")]
    LastPage { page: u32 },

    #[error("no new records (page {page})")]
    NoNewRecords { page: u32 },

    #[error("page limit reached (page {page})")]
    PageLimit { page: u32 },

    #[error("timed out on page {page}: {source}")]
    Timeout { page: u32, source: FetchError },

    #[error("cancelled before page {page}")]
    Cancelled { page: u32 },

    #[error("failed on page {page}: {source}")]
    Failed { page: u32, source: CrawlerError },
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::Failed { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Termination::Timeout { .. })
    }
}

/// Terminal output of one crawl instance.
#[derive(Debug)]
pub struct CrawlResult {
    pub source: SourceKind,
    pub records: Vec<Record>,
    pub stats: CrawlStats,
    pub termination: Termination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_fields_become_placeholders() {
        let record = Record::new(
            SourceKind::Indeed,
            "abc".to_string(),
            "https://kr.indeed.com/viewjob?jk=abc".to_string(),
            Some("Driver".to_string()),
            None,
            Some("   ".to_string()),
            Some(String::new()),
        );
        assert_eq!(record.title, "Driver");
        assert_eq!(record.company, PLACEHOLDER);
        assert_eq!(record.location, PLACEHOLDER);
        assert_eq!(record.salary, PLACEHOLDER);
    }

    #[test]
    fn serializes_with_stable_keys() {
        let record = Record::new(
            SourceKind::Work24,
            "K1".to_string(),
            "https://example.com/K1".to_string(),
            Some("Guard".to_string()),
            Some("ACME".to_string()),
            None,
            None,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "title": "Guard",
                "company": "ACME",
                "location": "-",
                "salary": "-",
                "job_id": "K1",
                "link": "https://example.com/K1",
                "source": "Work24",
            })
        );
    }

    #[test]
    fn detail_table_keeps_header_order() {
        let headers = vec!["모집직종".to_string(), "근무형태".to_string(), "모집직종".to_string()];
        let mut table = DetailTable::with_headers(headers.clone());
        table.push_row(
            &headers,
            vec!["a".to_string(), "b".to_string(), "c".to_string(), "extra".to_string()],
        );

        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.column("모집직종").unwrap(), &["a".to_string(), "c".to_string()]);
        assert_eq!(
            serde_json::to_string(&table).unwrap(),
            r#"{"모집직종":["a","c"],"근무형태":["b"]}"#
        );
    }
}
