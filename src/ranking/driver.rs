//! Pagination driver.
//!
//! Walks a JavaScript-rendered ranking table page by page for one category:
//!
//! ```text
//! INIT → LOADING → EXTRACTING → (ADVANCING → LOADING → EXTRACTING)* → DONE
//!                     ↘ FAILED (session start or first-page load timeout)
//! ```
//!
//! Every transition returns an explicit status; failures after the first
//! page end the walk with the rows gathered so far.

use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::delay::DelayStrategy;
use super::extract::{extract_page, ExtractionError};
use super::{NextControl, PageError, PageSession};
use crate::config::ScraperConfig;
use crate::types::{HeaderSet, RankingRow, RankingTable};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Driver limits, taken from `[scraper]` at construction.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub table_id: String,
    /// A page with fewer rows than this is the last one.
    pub page_size: usize,
    /// Hard ceiling on pages extracted.
    pub max_pages: usize,
    pub load_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::from(&ScraperConfig::default())
    }
}

impl From<&ScraperConfig> for DriverConfig {
    fn from(cfg: &ScraperConfig) -> Self {
        Self {
            table_id: cfg.table_id.clone(),
            page_size: cfg.page_size,
            max_pages: cfg.max_pages,
            load_timeout: cfg.load_timeout(),
        }
    }
}

impl DriverConfig {
    fn table_selector(&self) -> String {
        format!("#{}", self.table_id)
    }
}

// ---------------------------------------------------------------------------
// States and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Init,
    Loading,
    Extracting,
    Advancing,
    Done,
    Failed,
}

/// Why a walk ended in `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The table element was absent from the page.
    NoTable,
    /// The first page's header row had no labels.
    NoHeaders,
    /// The table had a header row but no data rows.
    EmptyTable,
    /// Fewer rows than a full page: the last page was reached.
    ShortPage { rows: usize },
    /// `max_pages` pages were extracted.
    PageCeiling,
    /// The next-page control was not on the page.
    NoNextControl,
    /// The next-page control was disabled or marked the current page.
    LastPage,
    /// Locating or clicking the next-page control failed.
    AdvanceFailed(String),
    /// A later page never rendered the table.
    LoadTimeout,
    /// Rendered content could not be read.
    ContentUnavailable(String),
}

/// Terminal failures: the category yields no data.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Could not start page session: {0}")]
    Session(PageError),

    #[error("Ranking table did not load: {0}")]
    LoadTimeout(PageError),
}

/// Successful walk over a category's pages.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub table: RankingTable,
    /// Pages that rendered the table. A later page that timed out is not
    /// counted.
    pub pages: usize,
    pub advances: usize,
    pub stop: StopReason,
    /// State sequence from `Init` to `Done`.
    pub transitions: Vec<DriverState>,
}

// ---------------------------------------------------------------------------
// Session guard
// ---------------------------------------------------------------------------

/// Closes the wrapped session when dropped, on every exit path.
struct SessionGuard<S: PageSession> {
    session: S,
}

impl<S: PageSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: PageSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: PageSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        debug!("Closing page session");
        self.session.close();
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct PaginationDriver<D: DelayStrategy> {
    config: DriverConfig,
    delay: D,
}

impl<D: DelayStrategy> PaginationDriver<D> {
    pub fn new(config: DriverConfig, delay: D) -> Self {
        Self { config, delay }
    }

    /// Scrape every page reachable from `url`.
    ///
    /// `open_session` is called exactly once; the session it returns is
    /// closed before this function returns, whatever the outcome.
    pub fn scrape<S, F>(&mut self, url: &str, open_session: F) -> Result<ScrapeReport, ScrapeError>
    where
        S: PageSession,
        F: FnOnce() -> Result<S, PageError>,
    {
        let mut transitions = vec![DriverState::Init];
        debug!(url, "Driver INIT");

        let mut session = SessionGuard {
            session: open_session().map_err(ScrapeError::Session)?,
        };
        session.open(url).map_err(ScrapeError::Session)?;

        let selector = self.config.table_selector();
        let mut headers: Option<HeaderSet> = None;
        let mut rows: Vec<RankingRow> = Vec::new();
        let mut page = 1usize;
        let mut advances = 0usize;

        let stop = loop {
            enter(&mut transitions, DriverState::Loading, page);
            if let Err(e) = session.wait_for(&selector, self.config.load_timeout) {
                if page == 1 {
                    warn!(error = %e, "Ranking table never appeared");
                    enter(&mut transitions, DriverState::Failed, page);
                    return Err(ScrapeError::LoadTimeout(e));
                }
                warn!(page, error = %e, "Page did not load, keeping rows gathered so far");
                break StopReason::LoadTimeout;
            }

            enter(&mut transitions, DriverState::Extracting, page);
            let content = match session.page_content() {
                Ok(content) => content,
                Err(e) => {
                    warn!(page, error = %e, "Could not read rendered page");
                    break StopReason::ContentUnavailable(e.to_string());
                }
            };

            let extract = match extract_page(&content, &self.config.table_id, headers.as_ref()) {
                Ok(extract) => extract,
                Err(ExtractionError::NoHeaders) => {
                    warn!(page, "Header row is empty");
                    break StopReason::NoHeaders;
                }
                Err(e) => {
                    warn!(page, error = %e, "No table on page");
                    break StopReason::NoTable;
                }
            };

            if extract.data_rows == 0 {
                info!(page, "Table has no data rows");
                break StopReason::EmptyTable;
            }
            if headers.is_none() {
                headers = extract.headers;
            }

            let count = extract.rows.len();
            if extract.data_rows > count {
                debug!(page, excluded = extract.data_rows - count, "Dropped short rows");
            }
            rows.extend(extract.rows);
            info!(page, rows = count, total = rows.len(), "Page extracted");

            if count < self.config.page_size {
                break StopReason::ShortPage { rows: count };
            }
            if page >= self.config.max_pages {
                info!(max_pages = self.config.max_pages, "Page ceiling reached");
                break StopReason::PageCeiling;
            }

            enter(&mut transitions, DriverState::Advancing, page);
            match session.locate_next_control() {
                Ok(NextControl::Enabled) => {}
                Ok(NextControl::Disabled) => break StopReason::LastPage,
                Ok(NextControl::Missing) => break StopReason::NoNextControl,
                Err(e) => {
                    warn!(page, error = %e, "Next-page control unavailable");
                    break StopReason::AdvanceFailed(e.to_string());
                }
            }
            if let Err(e) = session.click_next() {
                warn!(page, error = %e, "Next-page click failed");
                break StopReason::AdvanceFailed(e.to_string());
            }
            advances += 1;

            let waited = self.delay.pause();
            debug!(page, waited_ms = waited.as_millis() as u64, "Paused before next page");
            page += 1;
        };

        enter(&mut transitions, DriverState::Done, page);
        let pages = match stop {
            StopReason::LoadTimeout => page - 1,
            _ => page,
        };
        info!(pages, rows = rows.len(), stop = ?stop, "Pagination finished");

        Ok(ScrapeReport {
            table: RankingTable::new(headers.unwrap_or_default(), rows),
            pages,
            advances,
            stop,
            transitions,
        })
    }
}

fn enter(transitions: &mut Vec<DriverState>, next: DriverState, page: usize) {
    debug!(state = ?next, page, "Driver transition");
    transitions.push(next);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
