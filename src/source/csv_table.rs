//! Cached raw tables on disk.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::RowSource;
use crate::storage::{self, RunStamp};
use crate::types::{Category, RankingTable};

/// Reads the latest persisted raw table of a category for one period.
pub struct CsvTableSource {
    data_dir: PathBuf,
    stamp: RunStamp,
}

impl CsvTableSource {
    pub fn new(data_dir: impl Into<PathBuf>, stamp: RunStamp) -> Self {
        Self {
            data_dir: data_dir.into(),
            stamp,
        }
    }
}

#[async_trait]
impl RowSource for CsvTableSource {
    fn name(&self) -> &str {
        "csv"
    }

    /// Fails with `FundRankError::MissingInput` when no table was saved for
    /// the category in this period.
    async fn fetch(&self, category: Category) -> Result<RankingTable> {
        let path = storage::find_latest_raw(&self.data_dir, &self.stamp, category)?;
        info!(category = category.code(), path = %path.display(), "Loading cached table");

        let table = tokio::task::spawn_blocking(move || storage::read_table(&path)).await??;
        Ok(table)
    }
}
