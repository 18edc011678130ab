//! Run orchestrator.
//!
//! Drives the selected categories one after another: scrape each to a raw
//! table, or screen each from a `RowSource` into a shortlist and dry-run
//! investment plan. A failing category is recorded and skipped; it never
//! stops its siblings.

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::analysis::scoring::{ScoringConfig, ScoringEngine};
use crate::analysis::Screener;
use crate::config::AppConfig;
use crate::engine::planner::{InvestmentPlan, InvestmentPlanner};
use crate::ranking::chrome::{ChromeOptions, ChromeSession};
use crate::ranking::url::ranking_url;
use crate::ranking::{DriverConfig, PageError, PageSession, PaginationDriver, RandomDelay, StopReason};
use crate::source::RowSource;
use crate::storage::{self, RunStamp};
use crate::types::{Category, CategorySummary, FundRankError, RunSummary};

pub struct RunOrchestrator {
    config: AppConfig,
    stamp: RunStamp,
    screener: Screener,
    planner: InvestmentPlanner,
}

impl RunOrchestrator {
    pub fn new(config: AppConfig, stamp: RunStamp) -> Result<Self, FundRankError> {
        let screener = Screener::new(ScoringEngine::new(ScoringConfig::from(&config.scoring)));
        let planner = InvestmentPlanner::new(&config.investment)?;
        Ok(Self {
            config,
            stamp,
            screener,
            planner,
        })
    }

    pub fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.storage.data_dir)
    }

    fn results_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.storage.results_dir)
    }

    // -- Scraping -----------------------------------------------------------

    /// Scrape every category with a fresh headless Chrome session each.
    pub async fn scrape_with_chrome(&self, categories: &[Category]) -> RunSummary {
        let options = ChromeOptions::from(&self.config.scraper);
        self.scrape(categories, move || ChromeSession::launch(options.clone()))
            .await
    }

    /// Scrape every category, opening one session per category through
    /// `open_session`.
    ///
    /// Categories run strictly one at a time; each driver runs on the
    /// blocking pool.
    pub async fn scrape<S, F>(&self, categories: &[Category], open_session: F) -> RunSummary
    where
        S: PageSession + 'static,
        F: Fn() -> Result<S, PageError> + Clone + Send + 'static,
    {
        let mut summary = RunSummary::new(self.stamp.period.clone());

        for (i, &category) in categories.iter().enumerate() {
            info!(
                category = category.code(),
                label = category.label(),
                step = i + 1,
                of = categories.len(),
                "Scraping category"
            );
            let outcome = match self.scrape_one(category, open_session.clone()).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(category = category.code(), error = %e, "Category failed, moving on");
                    CategorySummary::failed(category, e.to_string())
                }
            };
            summary.categories.push(outcome);
        }

        summary.finish();
        summary
    }

    async fn scrape_one<S, F>(&self, category: Category, open_session: F) -> anyhow::Result<CategorySummary>
    where
        S: PageSession + 'static,
        F: Fn() -> Result<S, PageError> + Send + 'static,
    {
        let url = ranking_url(&self.config.scraper, category)?;
        let driver_config = DriverConfig::from(&self.config.scraper);
        let (min, max) = self.config.scraper.delay_range();

        let report = tokio::task::spawn_blocking(move || {
            let mut driver = PaginationDriver::new(driver_config, RandomDelay::new(min, max));
            driver.scrape(&url, open_session)
        })
        .await??;

        let mut outcome = CategorySummary::new(category);
        outcome.rows = report.table.len();
        if !matches!(report.stop, StopReason::ShortPage { .. } | StopReason::LastPage) {
            outcome.note = Some(format!("{:?}", report.stop));
        }

        if report.table.is_empty() {
            warn!(category = category.code(), stop = ?report.stop, "No rows scraped, nothing saved");
            return Ok(outcome);
        }

        let path = storage::raw_table_path(&self.data_dir(), &self.stamp, category);
        storage::write_table(&report.table, &path)?;
        info!(
            category = category.code(),
            rows = report.table.len(),
            pages = report.pages,
            path = %path.display(),
            "Category scraped"
        );
        outcome.output = Some(path.display().to_string());
        Ok(outcome)
    }

    // -- Screening ----------------------------------------------------------

    /// Clean, score and shortlist every category from `source`, then plan
    /// dry-run investments for the shortlists.
    pub async fn screen(&self, categories: &[Category], source: &dyn RowSource) -> RunSummary {
        let mut summary = RunSummary::new(self.stamp.period.clone());
        let mut plan = InvestmentPlan::default();

        for &category in categories {
            match self.screen_one(category, source).await {
                Ok((outcome, category_plan)) => {
                    plan.merge(category_plan);
                    summary.categories.push(outcome);
                }
                Err(e) => {
                    warn!(category = category.code(), source = source.name(), error = %e, "Skipping category");
                    summary.categories.push(CategorySummary::failed(category, e.to_string()));
                }
            }
        }

        summary.planned_orders = plan.orders.len();
        summary.planned_amount = plan.total_amount;
        summary.estimated_fees = plan.total_fees;
        summary.finish();

        info!(
            categories = summary.categories.len(),
            failed = summary.failures(),
            orders = summary.planned_orders,
            amount = %summary.planned_amount,
            fees = %summary.estimated_fees,
            "Screening run complete"
        );
        summary
    }

    async fn screen_one(
        &self,
        category: Category,
        source: &dyn RowSource,
    ) -> anyhow::Result<(CategorySummary, InvestmentPlan)> {
        let table = source.fetch(category).await?;
        let report = self.screener.screen(category, &table);

        let mut outcome = CategorySummary::new(category);
        outcome.rows = report.rows_in;
        outcome.eligible = report.eligible;
        outcome.shortlisted = report.shortlist.len();

        if report.shortlist.is_empty() {
            outcome.note = Some("no eligible funds".to_string());
            return Ok((outcome, InvestmentPlan::default()));
        }

        for (rank, scored) in report.shortlist.iter().enumerate() {
            info!(category = category.code(), rank = rank + 1, "{scored}");
        }

        let top_n = self.screener.engine().config().top_n;
        let path = storage::shortlist_path(&self.results_dir(), &self.stamp, category, top_n);
        storage::write_shortlist(&report.shortlist, category, &path)?;
        outcome.output = Some(path.display().to_string());

        let plan = self.planner.plan(category, &report.shortlist);
        Ok((outcome, plan))
    }

    // -- Summary ------------------------------------------------------------

    /// Persist a run summary next to the shortlists.
    pub fn save_summary(&self, summary: &RunSummary) -> anyhow::Result<PathBuf> {
        let path = storage::summary_path(&self.results_dir(), &self.stamp, summary);
        storage::save_summary(summary, &path)?;
        Ok(path)
    }
}
