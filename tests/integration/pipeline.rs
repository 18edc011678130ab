//! End-to-end pipeline tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;

use fundrank::analysis::cleaner;
use fundrank::analysis::scoring::{ScoringConfig, ScoringEngine};
use fundrank::config::AppConfig;
use fundrank::engine::RunOrchestrator;
use fundrank::ranking::{
    DriverConfig, DriverState, NextControl, NoDelay, PageError, PaginationDriver, ScrapeError,
    StopReason,
};
use fundrank::source::CsvTableSource;
use fundrank::storage::{self, RunStamp};
use fundrank::types::Category;

use crate::mock_page::{ranking_html, MockPage, ScriptedPage, HEADERS};

fn driver(page_size: usize) -> PaginationDriver<NoDelay> {
    PaginationDriver::new(
        DriverConfig {
            page_size,
            ..DriverConfig::default()
        },
        NoDelay,
    )
}

fn temp_root() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("fundrank_it_{}", uuid::Uuid::new_v4()));
    p
}

// ---------------------------------------------------------------------------
// Driver against a scripted page
// ---------------------------------------------------------------------------

#[test]
fn test_full_page_then_short_page() {
    let page = MockPage::new(vec![
        ScriptedPage::table(ranking_html(0, 50)),
        ScriptedPage::table(ranking_html(50, 80)),
    ]);
    let log = page.log();

    let report = driver(50).scrape("http://test/#tzq", || Ok(page)).unwrap();

    assert_eq!(report.table.len(), 80);
    assert_eq!(report.advances, 1);
    assert_eq!(report.pages, 2);
    assert_eq!(report.stop, StopReason::ShortPage { rows: 30 });
    assert_eq!(report.table.headers.labels(), HEADERS);
    assert_eq!(
        report.transitions,
        vec![
            DriverState::Init,
            DriverState::Loading,
            DriverState::Extracting,
            DriverState::Advancing,
            DriverState::Loading,
            DriverState::Extracting,
            DriverState::Done,
        ]
    );

    let log = MockPage::snapshot(&log);
    assert_eq!(log.clicks, 1);
    assert_eq!(log.closes, 1);
    assert_eq!(log.opened, vec!["http://test/#tzq".to_string()]);
}

#[test]
fn test_missing_table_on_later_page_keeps_rows() {
    let page = MockPage::new(vec![
        ScriptedPage::table(ranking_html(0, 3)),
        ScriptedPage::table("<html><body><p>维护中</p></body></html>".to_string()),
    ]);
    let log = page.log();

    let report = driver(3).scrape("http://test/#tgp", || Ok(page)).unwrap();

    assert_eq!(report.stop, StopReason::NoTable);
    assert_eq!(report.table.len(), 3);
    assert_eq!(*report.transitions.last().unwrap(), DriverState::Done);
    assert_eq!(MockPage::snapshot(&log).closes, 1);
}

#[test]
fn test_first_page_timeout_fails_and_closes() {
    let page = MockPage::new(vec![ScriptedPage::never_loads()]);
    let log = page.log();

    let result = driver(50).scrape("http://test/#tzs", || Ok(page));

    assert!(matches!(result, Err(ScrapeError::LoadTimeout(_))));
    let log = MockPage::snapshot(&log);
    assert_eq!(log.reads, 0);
    assert_eq!(log.closes, 1);
}

#[test]
fn test_navigation_failure_closes_session() {
    let page = MockPage::failing_open();
    let log = page.log();

    let result = driver(50).scrape("http://test/#tzs", || Ok(page));

    assert!(matches!(result, Err(ScrapeError::Session(_))));
    assert_eq!(MockPage::snapshot(&log).closes, 1);
}

#[test]
fn test_later_page_timeout_keeps_rows() {
    let page = MockPage::new(vec![
        ScriptedPage::table(ranking_html(0, 3)),
        ScriptedPage::never_loads(),
    ]);
    let report = driver(3).scrape("http://test/#thh", || Ok(page)).unwrap();
    assert_eq!(report.stop, StopReason::LoadTimeout);
    assert_eq!(report.table.len(), 3);
    assert_eq!(report.pages, 1);
}

#[test]
fn test_later_page_without_data_rows_keeps_rows() {
    let page = MockPage::new(vec![
        ScriptedPage::table(ranking_html(0, 3)),
        ScriptedPage::table(ranking_html(3, 3)),
    ]);
    let log = page.log();
    let report = driver(3).scrape("http://test/#tzq", || Ok(page)).unwrap();

    assert_eq!(report.stop, StopReason::EmptyTable);
    assert_eq!(report.table.len(), 3);
    let log = MockPage::snapshot(&log);
    assert_eq!(log.clicks, 1);
    assert_eq!(log.closes, 1);
}

#[test]
fn test_missing_next_control_ends_walk() {
    let page = MockPage::new(vec![
        ScriptedPage::table(ranking_html(0, 3)).with_next(NextControl::Missing),
    ]);
    let log = page.log();
    let report = driver(3).scrape("http://test/#tgp", || Ok(page)).unwrap();

    assert_eq!(report.stop, StopReason::NoNextControl);
    assert_eq!(report.table.len(), 3);
    let log = MockPage::snapshot(&log);
    assert_eq!(log.clicks, 0);
    assert_eq!(log.closes, 1);
}

#[test]
fn test_disabled_next_control_ends_walk() {
    let page = MockPage::new(vec![
        ScriptedPage::table(ranking_html(0, 3)).with_next(NextControl::Disabled),
    ]);
    let log = page.log();
    let report = driver(3).scrape("http://test/#tzq", || Ok(page)).unwrap();

    assert_eq!(report.stop, StopReason::LastPage);
    assert_eq!(report.advances, 0);
    assert_eq!(MockPage::snapshot(&log).clicks, 0);
}

#[test]
fn test_click_failure_keeps_partial_rows() {
    let page = MockPage::new(vec![ScriptedPage::table(ranking_html(0, 3)).failing_click()]);
    let report = driver(3).scrape("http://test/#tzq", || Ok(page)).unwrap();
    assert!(matches!(report.stop, StopReason::AdvanceFailed(_)));
    assert_eq!(report.table.len(), 3);
}

#[test]
fn test_short_rows_are_excluded() {
    let html = ranking_html(0, 3).replace(
        "</tbody>",
        "<tr><td>4</td><td>000099</td><td>残缺</td></tr></tbody>",
    );
    let page = MockPage::new(vec![ScriptedPage::table(html)]);
    let report = driver(50).scrape("http://test/#tzq", || Ok(page)).unwrap();

    assert_eq!(report.table.len(), 3);
    assert!(report.table.rows.iter().all(|r| r.cells().len() == HEADERS.len()));
}

// ---------------------------------------------------------------------------
// Scrape → clean → score
// ---------------------------------------------------------------------------

#[test]
fn test_scraped_table_scores_to_top_ten() {
    let page = MockPage::new(vec![ScriptedPage::table(ranking_html(1, 13))]);
    let report = driver(50).scrape("http://test/#tzq", || Ok(page)).unwrap();

    let records = cleaner::clean_table(&report.table);
    assert_eq!(records.len(), 12);

    let ranked = ScoringEngine::new(ScoringConfig::default()).score(&records);
    assert_eq!(ranked.len(), 10);
    assert!(ranked.windows(2).all(|w| w[0].composite >= w[1].composite));
    // 近1年 and 近6月 are present, so every fund gets a volatility.
    assert!(ranked.iter().all(|r| r.volatility.is_some()));

    let top = &ranked[0].scores;
    assert!(top.return_score.unwrap() <= 40.0 + 1e-9);
    assert!(top.risk_score.unwrap() <= 30.0 + 1e-9);
    assert!(top.fee_score.unwrap() <= 20.0 + 1e-9);
}

// ---------------------------------------------------------------------------
// Orchestrated run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_run_isolates_failing_category() {
    let root = temp_root();
    let stamp = RunStamp::from_date(NaiveDate::from_ymd_opt(2025, 7, 3).unwrap());

    let mut cfg = AppConfig::default();
    cfg.storage.data_dir = root.join("data").display().to_string();
    cfg.storage.results_dir = root.join("results").display().to_string();
    cfg.scraper.page_size = 5;
    cfg.scraper.delay_min_ms = 0;
    cfg.scraper.delay_max_ms = 0;
    for dir in [&cfg.storage.data_dir, &cfg.storage.results_dir] {
        std::fs::create_dir_all(storage::period_dir(std::path::Path::new(dir), &stamp)).unwrap();
    }

    // First session serves two pages; every later session never loads.
    let template = MockPage::new(vec![
        ScriptedPage::table(ranking_html(1, 6)),
        ScriptedPage::table(ranking_html(6, 9)),
    ]);
    let log = template.log();
    let calls = Arc::new(AtomicUsize::new(0));
    let factory = {
        let calls = Arc::clone(&calls);
        move || -> Result<MockPage, PageError> {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(template.clone())
            } else {
                Ok(MockPage::new(vec![ScriptedPage::never_loads()]))
            }
        }
    };

    let orchestrator = RunOrchestrator::new(cfg.clone(), stamp.clone()).unwrap();
    let categories = [Category::Index, Category::Bond];

    let scraped = orchestrator.scrape(&categories, factory).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(scraped.categories.len(), 2);
    assert_eq!(scraped.categories[0].rows, 8);
    assert!(!scraped.categories[0].failed);
    assert!(scraped.categories[1].failed);
    assert_eq!(scraped.failures(), 1);

    let log = MockPage::snapshot(&log);
    assert_eq!(log.clicks, 1);
    assert_eq!(log.closes, 1);

    let source = CsvTableSource::new(&cfg.storage.data_dir, stamp.clone());
    let screened = orchestrator.screen(&categories, &source).await;

    let index = &screened.categories[0];
    assert!(!index.failed);
    assert_eq!(index.eligible, 8);
    assert_eq!(index.shortlisted, 8);
    assert!(screened.categories[1].failed);
    assert_eq!(screened.planned_orders, 8);
    assert_eq!(screened.planned_amount, rust_decimal::Decimal::from(8000));

    let shortlist_path = PathBuf::from(index.output.clone().unwrap());
    let shortlist = storage::read_table(&shortlist_path).unwrap();
    assert_eq!(shortlist.len(), 8);
    assert_eq!(
        shortlist.rows[0].get(&shortlist.headers, "类型代码"),
        Some("tzs")
    );

    let summary_path = orchestrator.save_summary(&screened).unwrap();
    let loaded = storage::load_summary(&summary_path).unwrap().unwrap();
    assert_eq!(loaded.run_id, screened.run_id);
    assert_eq!(loaded.categories.len(), 2);

    std::fs::remove_dir_all(&root).unwrap();
}
