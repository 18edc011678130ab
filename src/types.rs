//! Shared types for the FUNDRANK pipeline.
//!
//! These types form the tabular contract used across all modules: the
//! scraper produces `RankingTable`s, the cleaner turns them into
//! `FundRecord`s and the scoring engine ranks them as `ScoredRecord`s.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Column labels
// ---------------------------------------------------------------------------

/// Fund code column (stable primary key).
pub const COL_CODE: &str = "基金代码";
/// Fund short name column.
pub const COL_NAME: &str = "基金简称";
/// 3-year return column. Records without it are never scored.
pub const COL_RETURN_3Y: &str = "近3年";
/// Purchase fee rate column.
pub const COL_FEE: &str = "手续费";
/// Fund scale column (optional, not present on every ranking source).
pub const COL_SCALE: &str = "基金规模";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A fund-type partition of the ranking site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Index,
    Equity,
    Hybrid,
    Bond,
}

impl Category {
    /// All known categories in menu order.
    pub const ALL: &'static [Category] = &[
        Category::Index,
        Category::Equity,
        Category::Hybrid,
        Category::Bond,
    ];

    /// Menu number shown by the CLI (1-based).
    pub fn menu_number(&self) -> u8 {
        match self {
            Category::Index => 1,
            Category::Equity => 2,
            Category::Hybrid => 3,
            Category::Bond => 4,
        }
    }

    /// Page-fragment selector used by the ranking page.
    pub fn code(&self) -> &'static str {
        match self {
            Category::Index => "tzs",
            Category::Equity => "tgp",
            Category::Hybrid => "thh",
            Category::Bond => "tzq",
        }
    }

    /// Human-readable label, also embedded in file names.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Index => "指数型",
            Category::Equity => "股票型",
            Category::Hybrid => "混合型",
            Category::Bond => "债券型",
        }
    }

    /// Fund-type code used by the live ranking endpoint.
    pub fn api_code(&self) -> &'static str {
        match self {
            Category::Index => "zs",
            Category::Equity => "gp",
            Category::Hybrid => "hh",
            Category::Bond => "zq",
        }
    }

    pub fn from_menu_number(n: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.menu_number() == n)
    }

    /// Parse a comma-separated selection such as `"1,3"`, `"tzq"`, `"5"`
    /// or `"all"`.
    ///
    /// Invalid entries are logged and ignored; duplicates collapse. Nothing
    /// valid selected is `FundRankError::EmptySelection`.
    pub fn parse_selection(input: &str) -> Result<Vec<Category>, FundRankError> {
        let input = input.trim();
        if input == "5" || input.eq_ignore_ascii_case("all") {
            return Ok(Self::ALL.to_vec());
        }

        let mut selected = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.parse::<Category>() {
                Ok(c) if !selected.contains(&c) => selected.push(c),
                Ok(_) => {}
                Err(e) => tracing::warn!(entry = part, error = %e, "Ignoring selection entry"),
            }
        }

        if selected.is_empty() {
            return Err(FundRankError::EmptySelection);
        }
        Ok(selected)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

/// Parse a menu number, page code or label (codes are case-insensitive).
impl std::str::FromStr for Category {
    type Err = FundRankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u8>() {
            return Self::from_menu_number(n)
                .ok_or_else(|| FundRankError::InvalidSelection(s.to_string()));
        }
        let lower = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code() == lower || c.label() == s)
            .ok_or_else(|| FundRankError::InvalidSelection(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Raw tables
// ---------------------------------------------------------------------------

/// Ordered column labels, captured once per scraping session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSet(Vec<String>);

impl HeaderSet {
    /// Build a header set, dropping empty labels.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            labels
                .into_iter()
                .map(Into::into)
                .filter(|l: &String| !l.is_empty())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    /// Index of a column by label.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|l| l == label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_some()
    }
}

/// One extracted table row: raw cell text aligned to a `HeaderSet`.
///
/// Rows are truncated to the header length at extraction time, so the
/// i-th cell always belongs to the i-th header label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRow(Vec<String>);

impl RankingRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self(cells)
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    /// Cell text for a column label.
    pub fn get<'a>(&'a self, headers: &HeaderSet, label: &str) -> Option<&'a str> {
        headers
            .position(label)
            .and_then(|i| self.0.get(i))
            .map(String::as_str)
    }
}

/// Rows sharing one header set. Unit of persistence: one table per
/// category per scraping run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingTable {
    pub headers: HeaderSet,
    pub rows: Vec<RankingRow>,
}

impl RankingTable {
    pub fn new(headers: HeaderSet, rows: Vec<RankingRow>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Cleaned and scored records
// ---------------------------------------------------------------------------

/// Shorter-horizon return columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Horizon {
    OneYear,
    SixMonths,
    ThreeMonths,
    OneMonth,
    OneWeek,
}

impl Horizon {
    pub const ALL: &'static [Horizon] = &[
        Horizon::OneYear,
        Horizon::SixMonths,
        Horizon::ThreeMonths,
        Horizon::OneMonth,
        Horizon::OneWeek,
    ];

    /// Horizons that feed the volatility proxy. The 1-week return is too
    /// noisy and is left out.
    pub const VOLATILITY: &'static [Horizon] = &[
        Horizon::OneYear,
        Horizon::SixMonths,
        Horizon::ThreeMonths,
        Horizon::OneMonth,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Horizon::OneYear => "近1年",
            Horizon::SixMonths => "近6月",
            Horizon::ThreeMonths => "近3月",
            Horizon::OneMonth => "近1月",
            Horizon::OneWeek => "近1周",
        }
    }
}

/// A cleaned ranking row, eligible for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    pub code: String,
    pub name: String,
    /// 3-year return in percent. Always present on a `FundRecord`.
    pub return_3y: f64,
    /// Fee rate in percent.
    pub fee: Option<f64>,
    /// Fund scale, when the source carries a scale column.
    pub scale: Option<f64>,
    /// Shorter-horizon returns; only horizons present in the header set
    /// appear here, each possibly missing for this fund.
    pub horizons: Vec<(Horizon, Option<f64>)>,
}

impl FundRecord {
    pub fn horizon(&self, horizon: Horizon) -> Option<f64> {
        self.horizons
            .iter()
            .find(|(h, _)| *h == horizon)
            .and_then(|(_, v)| *v)
    }
}

/// Weighted sub-scores. A missing sub-score contributes nothing to the
/// composite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub return_score: Option<f64>,
    pub risk_score: Option<f64>,
    pub fee_score: Option<f64>,
    pub scale_score: Option<f64>,
}

impl SubScores {
    pub fn total(&self) -> f64 {
        [self.return_score, self.risk_score, self.fee_score, self.scale_score]
            .iter()
            .flatten()
            .sum()
    }
}

/// A `FundRecord` plus derived risk/return metrics and its composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: FundRecord,
    pub volatility: Option<f64>,
    pub risk_adjusted: Option<f64>,
    pub scores: SubScores,
    pub composite: f64,
}

impl fmt::Display for ScoredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (score: {:.2} | 3y: {:.2}% | fee: {})",
            self.record.code,
            self.record.name,
            self.composite,
            self.record.return_3y,
            self.record
                .fee
                .map(|fee| format!("{fee:.2}%"))
                .unwrap_or_else(|| "--".to_string()),
        )
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Per-category outcome of a scrape or screening pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    /// Raw rows scraped or loaded.
    pub rows: usize,
    pub eligible: usize,
    pub shortlisted: usize,
    /// File written for this category, if any.
    pub output: Option<String>,
    /// Why the category was skipped or ended early.
    pub note: Option<String>,
    pub failed: bool,
}

impl CategorySummary {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            rows: 0,
            eligible: 0,
            shortlisted: 0,
            output: None,
            note: None,
            failed: false,
        }
    }

    pub fn failed(category: Category, reason: impl Into<String>) -> Self {
        Self {
            note: Some(reason.into()),
            failed: true,
            ..Self::new(category)
        }
    }
}

/// Persisted record of one CLI invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// `YYYYMM` period directory the run read from / wrote to.
    pub period: String,
    pub categories: Vec<CategorySummary>,
    pub planned_orders: usize,
    pub planned_amount: Decimal,
    pub estimated_fees: Decimal,
}

impl RunSummary {
    pub fn new(period: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            period: period.into(),
            categories: Vec::new(),
            planned_orders: 0,
            planned_amount: Decimal::ZERO,
            estimated_fees: Decimal::ZERO,
        }
    }

    pub fn failures(&self) -> usize {
        self.categories.iter().filter(|c| c.failed).count()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Crate-level error types surfaced to the run orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum FundRankError {
    #[error("Invalid category selection: {0}")]
    InvalidSelection(String),

    #[error("No fund category selected")]
    EmptySelection,

    #[error("Input table not found for {category} in {dir}")]
    MissingInput { category: String, dir: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
