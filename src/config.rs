//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section carries defaults, so a partial file (or none at all) still yields
//! a usable configuration. Sections are handed to the components that need
//! them at construction time.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub scoring: ScoringSection,
    pub investment: InvestmentConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    /// `id` attribute of the ranking table element.
    pub table_id: String,
    /// XPath of the "next page" control in the pagination bar.
    pub next_control_xpath: String,
    /// Rows on every page but the last.
    pub page_size: usize,
    /// Hard ceiling on pages visited per category.
    pub max_pages: usize,
    pub load_timeout_secs: u64,
    /// Pause before reading rendered content, for the table script to finish.
    pub render_settle_ms: u64,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub sort_field: String,
    pub sort_direction: String,
    /// Inclusive date range, `YYYY-MM-DD`.
    pub start_date: String,
    pub end_date: String,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: String,
    /// Chrome binary. `CHROME_PATH` takes precedence when set.
    pub chrome_path: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "http://fund.eastmoney.com/data/fundranking.html".to_string(),
            table_id: "dbtable".to_string(),
            next_control_xpath: r#"//*[@id="pagebar"]/label[8]"#.to_string(),
            page_size: 50,
            max_pages: 160,
            load_timeout_secs: 20,
            render_settle_ms: 3000,
            delay_min_ms: 2000,
            delay_max_ms: 5000,
            sort_field: "1nzf".to_string(),
            sort_direction: "desc".to_string(),
            start_date: "2024-07-01".to_string(),
            end_date: "2025-07-01".to_string(),
            headless: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            chrome_path: None,
        }
    }
}

impl ScraperConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }

    /// Randomized inter-page delay range.
    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.delay_min_ms),
            Duration::from_millis(self.delay_max_ms),
        )
    }
}

/// Live ranking endpoint (alternative row source to the rendered page).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub referer: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://fund.eastmoney.com/data/rankhandler.aspx".to_string(),
            referer: "http://fund.eastmoney.com/data/fundranking.html".to_string(),
            page_size: 500,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Raw tables, one subdirectory per period.
    pub data_dir: String,
    /// Shortlists and run summaries, one subdirectory per period.
    pub results_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            results_dir: "results".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringSection {
    pub top_n: usize,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InvestmentConfig {
    pub amount_per_fund: f64,
    pub dry_run: bool,
}

impl Default for InvestmentConfig {
    fn default() -> Self {
        Self {
            amount_per_fund: 1000.0,
            dry_run: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::warn!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }
}
