//! Row sources for screening.
//!
//! Defines the `RowSource` trait and provides:
//! - `csv_table` — cached read of a persisted raw table
//! - `rank_api` — live fetch from the ranking data endpoint

pub mod csv_table;
pub mod rank_api;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Category, RankingTable};

pub use csv_table::CsvTableSource;
pub use rank_api::RankApiSource;

/// Where the cleaner's input table comes from.
///
/// The pagination driver is one producer of raw tables; screening can run
/// against any implementation of this trait instead.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Full raw table for one category.
    async fn fetch(&self, category: Category) -> Result<RankingTable>;
}
