//! Ranking-page scraping.
//!
//! Defines the `PageSession` capability the pagination driver runs
//! against, and provides:
//! - `extract` — parses one rendered page into headers and raw rows
//! - `driver` — the pagination state machine
//! - `delay` — injectable inter-page delay strategies
//! - `chrome` — headless Chrome implementation of `PageSession`
//! - `url` — ranking page URL construction

pub mod chrome;
pub mod delay;
pub mod driver;
pub mod extract;
pub mod url;

use std::time::Duration;

pub use delay::{DelayStrategy, NoDelay, RandomDelay};
pub use driver::{DriverConfig, DriverState, PaginationDriver, ScrapeError, ScrapeReport, StopReason};
pub use extract::{extract_page, ExtractionError, PageExtract};

/// State of the pagination bar's "next page" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    /// Present and clickable.
    Enabled,
    /// Present but marked disabled, or marking the current (last) page.
    Disabled,
    /// Not found on the page.
    Missing,
}

/// Failures of the page-rendering backend.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Timed out after {timeout_secs}s waiting for '{selector}'")]
    Timeout { selector: String, timeout_secs: u64 },

    #[error("Element not found: {0}")]
    ElementMissing(String),

    #[error("Page interaction failed: {0}")]
    Interaction(String),

    #[error("Browser session error: {0}")]
    Session(String),
}

/// Abstraction over a browser-controlled page.
///
/// The driver owns one session per category and calls `close` exactly once
/// on every exit path. Implementors must tolerate `close` being the last
/// call after any failure.
#[cfg_attr(test, mockall::automock)]
pub trait PageSession {
    /// Navigate to the ranking page.
    fn open(&mut self, url: &str) -> Result<(), PageError>;

    /// Block until an element matching `selector` exists, up to `timeout`.
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), PageError>;

    /// Rendered markup of the current page.
    fn page_content(&mut self) -> Result<String, PageError>;

    /// Inspect the "next page" control.
    fn locate_next_control(&mut self) -> Result<NextControl, PageError>;

    /// Activate the "next page" control.
    fn click_next(&mut self) -> Result<(), PageError>;

    /// Tear the session down.
    fn close(&mut self);
}
