//! Persistence layer.
//!
//! Raw ranking tables and shortlists are written as UTF-8 CSV with a
//! byte-order mark, one file per category, under a `YYYYMM` period
//! subdirectory. Run summaries are JSON.
//!
//! Nothing here creates directories: writing into a missing period
//! directory is an error, and looking up a raw table that does not exist
//! is a `FundRankError::MissingInput`.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{
    Category, FundRankError, HeaderSet, RankingRow, RankingTable, RunSummary, ScoredRecord,
    COL_CODE, COL_FEE, COL_NAME, COL_RETURN_3Y,
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const RAW_PREFIX: &str = "fund_ranking";

// ---------------------------------------------------------------------------
// Run stamp
// ---------------------------------------------------------------------------

/// Period directory and date stamp embedded in file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    /// `YYYYMM`
    pub period: String,
    /// `YYYYMMDD`
    pub date: String,
}

impl RunStamp {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            period: date.format("%Y%m").to_string(),
            date: date.format("%Y%m%d").to_string(),
        }
    }

    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Same date stamp, different period directory.
    pub fn with_period(self, period: &str) -> Result<Self, FundRankError> {
        NaiveDate::parse_from_str(&format!("{period}01"), "%Y%m%d")
            .map_err(|_| FundRankError::Config(format!("period must be YYYYMM, got '{period}'")))?;
        Ok(Self {
            period: period.to_string(),
            ..self
        })
    }
}

pub fn period_dir(root: &Path, stamp: &RunStamp) -> PathBuf {
    root.join(&stamp.period)
}

pub fn raw_table_path(data_dir: &Path, stamp: &RunStamp, category: Category) -> PathBuf {
    period_dir(data_dir, stamp).join(format!(
        "{RAW_PREFIX}_{}_{}_{}.csv",
        category.code(),
        category.label(),
        stamp.date
    ))
}

pub fn shortlist_path(
    results_dir: &Path,
    stamp: &RunStamp,
    category: Category,
    top_n: usize,
) -> PathBuf {
    period_dir(results_dir, stamp).join(format!(
        "top{top_n}_{}_{}_{}.csv",
        category.code(),
        category.label(),
        stamp.date
    ))
}

pub fn summary_path(results_dir: &Path, stamp: &RunStamp, summary: &RunSummary) -> PathBuf {
    let short_id: String = summary.run_id.chars().take(8).collect();
    period_dir(results_dir, stamp).join(format!("run_summary_{}_{short_id}.json", stamp.date))
}

// ---------------------------------------------------------------------------
// Raw tables
// ---------------------------------------------------------------------------

/// Write a raw table in header order.
pub fn write_table(table: &RankingTable, path: &Path) -> Result<()> {
    write_csv(
        path,
        table.headers.labels(),
        table.rows.iter().map(|r| r.cells().to_vec()),
    )?;
    info!(path = %path.display(), rows = table.len(), "Raw table saved");
    Ok(())
}

/// Read a raw table written by `write_table` (or any CSV with a header row).
pub fn read_table(path: &Path) -> Result<RankingTable> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read table from {}", path.display()))?;
    let table = parse_table(&bytes)
        .with_context(|| format!("Failed to parse table from {}", path.display()))?;
    debug!(path = %path.display(), rows = table.len(), "Raw table loaded");
    Ok(table)
}

/// Parse CSV bytes, tolerating a leading byte-order mark.
///
/// Columns with an empty header label are dropped from every row.
pub fn parse_table(bytes: &[u8]) -> Result<RankingTable> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let raw_headers = reader.headers().context("Missing header row")?.clone();
    let keep: Vec<usize> = raw_headers
        .iter()
        .enumerate()
        .filter(|(_, label)| !label.trim().is_empty())
        .map(|(i, _)| i)
        .collect();
    let headers = HeaderSet::new(raw_headers.iter().map(|l| l.trim().to_string()));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed CSV record")?;
        let cells = keep
            .iter()
            .filter_map(|&i| record.get(i))
            .map(str::to_string)
            .collect();
        rows.push(RankingRow::new(cells));
    }
    Ok(RankingTable::new(headers, rows))
}

/// Most recent raw table for a category in a period directory.
///
/// File names embed a `YYYYMMDD` stamp, so the lexicographic maximum is
/// the latest.
pub fn find_latest_raw(
    data_dir: &Path,
    stamp: &RunStamp,
    category: Category,
) -> Result<PathBuf, FundRankError> {
    let dir = period_dir(data_dir, stamp);
    let missing = || FundRankError::MissingInput {
        category: category.to_string(),
        dir: dir.display().to_string(),
    };
    let prefix = format!("{RAW_PREFIX}_{}_", category.code());

    let entries = std::fs::read_dir(&dir).map_err(|_| missing())?;
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".csv"))
                .unwrap_or(false)
        })
        .max()
        .ok_or_else(missing)
}

// ---------------------------------------------------------------------------
// Shortlists
// ---------------------------------------------------------------------------

/// Write a scored shortlist with the category label and code appended.
///
/// The scale sub-score column is only written when some record has one.
pub fn write_shortlist(shortlist: &[ScoredRecord], category: Category, path: &Path) -> Result<()> {
    let with_scale = shortlist.iter().any(|s| s.scores.scale_score.is_some());

    let mut header: Vec<String> = [COL_CODE, COL_NAME, "综合评分", "收益评分", "风险评分", "费率评分"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if with_scale {
        header.push("规模评分".to_string());
    }
    header.extend(
        ["波动率", "风险调整收益", COL_RETURN_3Y, COL_FEE, "基金类型", "类型代码"]
            .iter()
            .map(|s| s.to_string()),
    );

    let rows = shortlist.iter().map(|s| {
        let mut row = vec![
            s.record.code.clone(),
            s.record.name.clone(),
            number(Some(s.composite)),
            number(s.scores.return_score),
            number(s.scores.risk_score),
            number(s.scores.fee_score),
        ];
        if with_scale {
            row.push(number(s.scores.scale_score));
        }
        row.extend([
            number(s.volatility),
            number(s.risk_adjusted),
            number(Some(s.record.return_3y)),
            number(s.record.fee),
            category.label().to_string(),
            category.code().to_string(),
        ]);
        row
    });

    write_csv(path, &header, rows)?;
    info!(path = %path.display(), funds = shortlist.len(), "Shortlist saved");
    Ok(())
}

fn number(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

fn write_csv<I>(path: &Path, header: &[String], rows: I) -> Result<()>
where
    I: Iterator<Item = Vec<String>>,
{
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
    writer
        .write_record(header)
        .context("Failed to write CSV header")?;
    for row in rows {
        writer.write_record(&row).context("Failed to write CSV row")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Run summaries
// ---------------------------------------------------------------------------

pub fn save_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialise run summary")?;
    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write run summary to {}", path.display()))?;
    debug!(path = %path.display(), run_id = %summary.run_id, "Run summary saved");
    Ok(())
}

/// Returns `None` if the file doesn't exist.
pub fn load_summary(path: &Path) -> Result<Option<RunSummary>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run summary from {}", path.display()))?;
    let summary = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse run summary from {}", path.display()))?;
    Ok(Some(summary))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
