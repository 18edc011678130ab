//! Ranking page URL construction.
//!
//! The ranking page keeps its whole query in the URL fragment:
//! `{base}#{category};c0;r;s{sort};pn{page_size};d{dir};qsd{start};qed{end};...`

use chrono::NaiveDate;

use crate::config::ScraperConfig;
use crate::types::{Category, FundRankError};

/// Fixed trailing filter flags the page expects after the date range.
const FRAGMENT_TAIL: &str = "qdii;zq;gg;gzbd;gzfs;bbzt;sfbb";

/// `YYYY-MM-DD` → `YYYYMMDD`.
fn compact_date(date: &str) -> Result<String, FundRankError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%Y%m%d").to_string())
        .map_err(|e| FundRankError::Config(format!("invalid date '{date}': {e}")))
}

/// Build the ranking page URL for one category.
pub fn ranking_url(cfg: &ScraperConfig, category: Category) -> Result<String, FundRankError> {
    let direction = match cfg.sort_direction.to_lowercase().as_str() {
        "asc" => "asc",
        "desc" => "desc",
        other => {
            return Err(FundRankError::Config(format!(
                "sort_direction must be 'asc' or 'desc', got '{other}'"
            )))
        }
    };

    Ok(format!(
        "{base}#{code};c0;r;s{sort};pn{size};d{direction};qsd{start};qed{end};{FRAGMENT_TAIL}",
        base = cfg.base_url,
        code = category.code(),
        sort = cfg.sort_field,
        size = cfg.page_size,
        start = compact_date(&cfg.start_date)?,
        end = compact_date(&cfg.end_date)?,
    ))
}
