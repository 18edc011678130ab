//! Headless Chrome page session.
//!
//! One Chrome process and one tab per session. `headless_chrome` calls are
//! blocking; callers on the async runtime run the driver inside
//! `spawn_blocking`. The Chrome process is killed when the session drops.

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{NextControl, PageError, PageSession};
use crate::config::ScraperConfig;

/// Browsers idle longer than this are torn down by `headless_chrome`.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

/// Launch and page settings for a Chrome session.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub window_size: (u32, u32),
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub render_settle: Duration,
    pub next_control_xpath: String,
}

impl From<&ScraperConfig> for ChromeOptions {
    fn from(cfg: &ScraperConfig) -> Self {
        Self {
            headless: cfg.headless,
            window_size: (cfg.window_width, cfg.window_height),
            user_agent: cfg.user_agent.clone(),
            chrome_path: cfg.chrome_path.as_ref().map(PathBuf::from),
            render_settle: cfg.render_settle(),
            next_control_xpath: cfg.next_control_xpath.clone(),
        }
    }
}

pub struct ChromeSession {
    // Dropping the browser kills the Chrome process.
    _browser: Browser,
    tab: Arc<Tab>,
    options: ChromeOptions,
    closed: bool,
}

impl ChromeSession {
    /// Launch Chrome and open a blank tab.
    ///
    /// The sandbox is disabled inside containers (detected via
    /// `/.dockerenv` or `FUNDRANK_CONTAINER`). `CHROME_PATH` overrides the
    /// configured binary.
    pub fn launch(options: ChromeOptions) -> Result<Self, PageError> {
        let is_container = std::env::var("FUNDRANK_CONTAINER").is_ok()
            || Path::new("/.dockerenv").exists();
        let chrome_path = std::env::var("CHROME_PATH")
            .ok()
            .map(PathBuf::from)
            .or_else(|| options.chrome_path.clone());

        let launch = LaunchOptions::default_builder()
            .headless(options.headless)
            .sandbox(!is_container)
            .window_size(Some(options.window_size))
            .path(chrome_path)
            .args(vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
            ])
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| PageError::Session(format!("Failed to build Chrome launch options: {e}")))?;

        let browser = Browser::new(launch)
            .map_err(|e| PageError::Session(format!("Failed to launch Chrome: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| PageError::Session(format!("Failed to create browser tab: {e}")))?;
        tab.set_user_agent(&options.user_agent, None, None)
            .map_err(|e| PageError::Session(format!("Failed to set user agent: {e}")))?;

        info!(headless = options.headless, sandbox = !is_container, "Chrome session started");
        Ok(Self {
            _browser: browser,
            tab,
            options,
            closed: false,
        })
    }
}

impl PageSession for ChromeSession {
    fn open(&mut self, url: &str) -> Result<(), PageError> {
        debug!(url, "Navigating");
        self.tab
            .navigate_to(url)
            .map_err(|e| PageError::Session(format!("Failed to navigate to {url}: {e}")))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| PageError::Session(format!("Page failed to load: {e}")))?;
        Ok(())
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| {
                debug!(selector, error = %e, "Element wait failed");
                PageError::Timeout {
                    selector: selector.to_string(),
                    timeout_secs: timeout.as_secs(),
                }
            })
    }

    fn page_content(&mut self) -> Result<String, PageError> {
        std::thread::sleep(self.options.render_settle);
        self.tab
            .get_content()
            .map_err(|e| PageError::Interaction(format!("Failed to get page content: {e}")))
    }

    fn locate_next_control(&mut self) -> Result<NextControl, PageError> {
        let element = match self.tab.find_element_by_xpath(&self.options.next_control_xpath) {
            Ok(element) => element,
            Err(e) => {
                debug!(error = %e, "Next-page control not found");
                return Ok(NextControl::Missing);
            }
        };
        let class = element
            .get_attribute_value("class")
            .map_err(|e| PageError::Interaction(format!("Failed to read control class: {e}")))?
            .unwrap_or_default();

        if class.contains("disabled") || class.contains("current") {
            Ok(NextControl::Disabled)
        } else {
            Ok(NextControl::Enabled)
        }
    }

    fn click_next(&mut self) -> Result<(), PageError> {
        let xpath = &self.options.next_control_xpath;
        let element = self
            .tab
            .find_element_by_xpath(xpath)
            .map_err(|_| PageError::ElementMissing(xpath.clone()))?;
        // A script click sidesteps overlays that swallow synthetic mouse events.
        element
            .call_js_fn("function() { this.click(); }", vec![], false)
            .map_err(|e| PageError::Interaction(format!("Next-page click failed: {e}")))?;
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.tab.close(false) {
            debug!(error = %e, "Tab close failed, browser shutdown will reap it");
        }
        info!("Chrome session closed");
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.close();
    }
}
