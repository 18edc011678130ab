//! Screening: data cleaning and composite scoring.

pub mod cleaner;
pub mod scoring;

use tracing::{info, warn};

use crate::types::{Category, RankingTable, ScoredRecord};
use scoring::ScoringEngine;

/// Outcome of screening one category's table.
#[derive(Debug, Clone)]
pub struct ScreenReport {
    pub category: Category,
    /// Raw rows handed to the cleaner.
    pub rows_in: usize,
    /// Records with a numeric 3-year return.
    pub eligible: usize,
    /// Top records, best first.
    pub shortlist: Vec<ScoredRecord>,
}

/// Pipelines cleaning → scoring → top-N selection.
pub struct Screener {
    engine: ScoringEngine,
}

impl Screener {
    pub fn new(engine: ScoringEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Clean and score one category's raw table.
    ///
    /// An empty or all-ineligible table yields an empty shortlist.
    pub fn screen(&self, category: Category, table: &RankingTable) -> ScreenReport {
        let records = cleaner::clean_table(table);
        if records.is_empty() {
            warn!(category = category.code(), rows = table.len(), "No eligible funds");
        }

        let shortlist = self.engine.score(&records);
        info!(
            category = category.code(),
            rows = table.len(),
            eligible = records.len(),
            shortlisted = shortlist.len(),
            "Screening complete"
        );

        ScreenReport {
            category,
            rows_in: table.len(),
            eligible: records.len(),
            shortlist,
        }
    }
}
