use super::Sink;
use crate::data::Table;
use crate::error::CrawlerError;
use crate::record::Record;
use crate::utils;

use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use tracing::{debug, info};

pub struct PostingTable {
    name: String,
    pool: SqlitePool,
}

#[async_trait::async_trait]
impl Table for PostingTable {
    fn get_name(&self) -> &str {
        self.name.as_str()
    }

    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create(&self) -> Result<(), sqlx::Error> {
        if !utils::is_table_exists(self.get_pool(), &self.name).await? {
            let query = format!(
                r#"
                    CREATE TABLE {} (
                        position INTEGER,
                        source TEXT,
                        id TEXT,
                        title TEXT,
                        company TEXT,
                        location TEXT,
                        salary TEXT,
                        link TEXT,
                        overview TEXT,
                        details TEXT,
                        created_at DATETIME,
                        PRIMARY KEY (source, id)
                    )
                "#,
                &self.name
            );
            sqlx::query(query.as_str()).execute(self.get_pool()).await?;
        }
        Ok(())
    }
}

impl PostingTable {
    /// Replaces every row with `records` in one transaction.
    pub async fn replace_all(&self, records: &[Record]) -> Result<(), CrawlerError> {
        let timestamp = utils::get_now();
        let mut tx = self.get_pool().begin().await?;

        let query = format!("DELETE FROM {}", self.name);
        sqlx::query(&query).execute(&mut tx).await?;

        let query = format!(
            r#"INSERT OR IGNORE INTO {} (
                position,
                source,
                id,
                title,
                company,
                location,
                salary,
                link,
                overview,
                details,
                created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            self.name
        );
        for (position, record) in records.iter().enumerate() {
            let details = record
                .details
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            sqlx::query(&query)
                .bind(position as i64)
                .bind(record.source.as_str())
                .bind(record.id.as_str())
                .bind(record.title.as_str())
                .bind(record.company.as_str())
                .bind(record.location.as_str())
                .bind(record.salary.as_str())
                .bind(record.source_url.as_str())
                .bind(record.overview.as_deref())
                .bind(details)
                .bind(timestamp)
                .execute(&mut tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Stores postings in `<name>.db`, table `<name>_postings`.
pub struct SqliteSink {
    pub postings: PostingTable,
}

impl SqliteSink {
    pub async fn new(name: &str) -> Result<SqliteSink, CrawlerError> {
        let opt = SqliteConnectOptions::new()
            .filename(format!("{}.db", name))
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opt).await?;
        let sink = SqliteSink {
            postings: PostingTable {
                name: format!("{}_postings", table_prefix(name)),
                pool,
            },
        };

        if !utils::is_table_exists(sink.postings.get_pool(), sink.postings.get_name()).await? {
            debug!("Create table {}", sink.postings.get_name());
            sink.postings.create().await?;
        } else {
            debug!("Use table {}", sink.postings.get_name());
        }

        Ok(sink)
    }
}

// Table names come from the file stem, minus anything SQL would choke on.
fn table_prefix(name: &str) -> String {
    let stem = std::path::Path::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("jobs");
    let prefix: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if prefix.is_empty() {
        "jobs".to_string()
    } else {
        prefix
    }
}

#[async_trait::async_trait]
impl Sink for SqliteSink {
    async fn save(&self, records: &[Record]) -> Result<usize, CrawlerError> {
        self.postings.replace_all(records).await?;
        info!(
            "Saved {} records to table {}",
            records.len(),
            self.postings.get_name()
        );
        Ok(records.len())
    }
}
