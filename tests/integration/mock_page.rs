//! Scripted page session for integration testing.
//!
//! Provides a deterministic `PageSession` that serves a fixed sequence of
//! rendered pages, advancing one page per successful click, and records
//! every call in a shared log so tests can inspect what the driver did
//! after the session has been consumed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fundrank::ranking::{NextControl, PageError, PageSession};

/// One page as the mock browser renders it.
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    pub html: String,
    /// When false, waiting for the table times out.
    pub renders: bool,
    pub next: NextControl,
    pub click_fails: bool,
}

impl ScriptedPage {
    /// A rendered page whose next-page control is enabled.
    pub fn table(html: String) -> Self {
        Self {
            html,
            renders: true,
            next: NextControl::Enabled,
            click_fails: false,
        }
    }

    pub fn with_next(mut self, next: NextControl) -> Self {
        self.next = next;
        self
    }

    pub fn failing_click(mut self) -> Self {
        self.click_fails = true;
        self
    }

    /// A page that never renders the table.
    pub fn never_loads() -> Self {
        Self {
            html: String::new(),
            renders: false,
            next: NextControl::Missing,
            click_fails: false,
        }
    }
}

/// Calls observed across every session sharing the log.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    pub opened: Vec<String>,
    pub waits: usize,
    pub reads: usize,
    pub clicks: usize,
    pub closes: usize,
}

#[derive(Debug, Clone)]
pub struct MockPage {
    pages: Vec<ScriptedPage>,
    current: usize,
    log: Arc<Mutex<SessionLog>>,
    fail_open: bool,
}

impl MockPage {
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self {
            pages,
            current: 0,
            log: Arc::new(Mutex::new(SessionLog::default())),
            fail_open: false,
        }
    }

    /// Navigation itself fails.
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }

    /// Shared handle to the call log.
    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        Arc::clone(&self.log)
    }

    pub fn snapshot(log: &Arc<Mutex<SessionLog>>) -> SessionLog {
        log.lock().unwrap().clone()
    }

    fn page(&self) -> Option<&ScriptedPage> {
        self.pages.get(self.current)
    }
}

impl PageSession for MockPage {
    fn open(&mut self, url: &str) -> Result<(), PageError> {
        if self.fail_open {
            return Err(PageError::Session("navigation refused".to_string()));
        }
        self.log.lock().unwrap().opened.push(url.to_string());
        Ok(())
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        self.log.lock().unwrap().waits += 1;
        match self.page() {
            Some(page) if page.renders => Ok(()),
            _ => Err(PageError::Timeout {
                selector: selector.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    fn page_content(&mut self) -> Result<String, PageError> {
        self.log.lock().unwrap().reads += 1;
        self.page()
            .map(|p| p.html.clone())
            .ok_or_else(|| PageError::Interaction("no page".to_string()))
    }

    fn locate_next_control(&mut self) -> Result<NextControl, PageError> {
        Ok(self.page().map(|p| p.next).unwrap_or(NextControl::Missing))
    }

    fn click_next(&mut self) -> Result<(), PageError> {
        if self.page().map(|p| p.click_fails).unwrap_or(false) {
            return Err(PageError::Interaction("click swallowed".to_string()));
        }
        self.log.lock().unwrap().clicks += 1;
        self.current += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }
}

// ---------------------------------------------------------------------------
// Page fixtures
// ---------------------------------------------------------------------------

pub const HEADERS: &[&str] = &["序号", "基金代码", "基金简称", "近1年", "近6月", "近3年", "手续费"];

/// A ranking table with funds numbered `from..to`.
///
/// Fund `i` has a 3-year return of `i`%, a fee of `(i % 5) / 10`% and
/// shorter-horizon returns derived from `i`.
pub fn ranking_html(from: usize, to: usize) -> String {
    let mut html = String::from("<html><body><table id=\"dbtable\"><thead><tr>");
    for h in HEADERS {
        html.push_str(&format!("<th>{h}</th>"));
    }
    html.push_str("</tr></thead><tbody>");
    for i in from..to {
        html.push_str(&format!(
            "<tr><td>{n}</td><td>{i:06}</td><td>基金{i}</td><td>{y1:.2}%</td><td>{m6:.2}%</td>\
             <td>{i}.00%</td><td>{fee:.2}%</td></tr>",
            n = i + 1,
            y1 = i as f64 / 3.0,
            m6 = i as f64 / 7.0,
            fee = (i % 5) as f64 / 10.0,
        ));
    }
    html.push_str("</tbody></table></body></html>");
    html
}
