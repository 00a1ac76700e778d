use chrono::{DateTime, FixedOffset};
use lazy_regex::regex;
use sqlx::SqlitePool;

pub(crate) async fn is_table_exists(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<bool, sqlx::Error> {
    Ok(
        sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?
            .is_some(),
    )
}

pub(crate) fn get_now() -> DateTime<FixedOffset> {
    let now = chrono::offset::Local::now();
    now.with_timezone(now.offset())
}

/// Collapses runs of whitespace into one space and trims the ends.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    regex!(r"\s+").replace_all(text, " ").trim().to_string()
}
