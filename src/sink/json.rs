use super::Sink;
use crate::error::CrawlerError;
use crate::record::Record;

use std::path::{Path, PathBuf};
use tracing::info;

/// Pretty-printed JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> JsonFileSink {
        JsonFileSink {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Sink for JsonFileSink {
    async fn save(&self, records: &[Record]) -> Result<usize, CrawlerError> {
        let json = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&self.path, json).await?;
        info!("Saved {} records to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}
