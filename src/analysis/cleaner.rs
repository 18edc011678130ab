//! Raw cell cleaning.
//!
//! Turns scraped text cells into `FundRecord`s. Coercion never fails: any
//! cell that is not a number becomes a missing value, and rows missing the
//! 3-year return are dropped.

use tracing::{debug, warn};

use crate::types::{
    FundRecord, HeaderSet, Horizon, RankingRow, RankingTable, COL_CODE, COL_FEE, COL_NAME,
    COL_RETURN_3Y, COL_SCALE,
};

/// Placeholders the ranking site prints for unavailable values.
pub const MISSING_TOKENS: &[&str] = &["---", "--"];

/// Parse a cell like `"12.34%"` or `"1,234.5"`.
///
/// Sentinel tokens, blanks and anything unparsable yield `None`.
pub fn coerce(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || MISSING_TOKENS.contains(&cell) {
        return None;
    }
    let cleaned = cell.trim_end_matches('%').replace(',', "");
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Clean every row of a table.
pub fn clean_table(table: &RankingTable) -> Vec<FundRecord> {
    clean(&table.rows, &table.headers)
}

/// Clean rows against their header set.
///
/// Only horizon columns present in `headers` are carried on the records.
pub fn clean(rows: &[RankingRow], headers: &HeaderSet) -> Vec<FundRecord> {
    if !headers.contains(COL_RETURN_3Y) {
        warn!(column = COL_RETURN_3Y, "Column missing, no fund is eligible");
        return Vec::new();
    }

    let horizons: Vec<Horizon> = Horizon::ALL
        .iter()
        .copied()
        .filter(|h| headers.contains(h.label()))
        .collect();
    let numeric = |row: &RankingRow, label: &str| row.get(headers, label).and_then(coerce);

    let records: Vec<FundRecord> = rows
        .iter()
        .filter_map(|row| {
            let return_3y = numeric(row, COL_RETURN_3Y)?;
            Some(FundRecord {
                code: row.get(headers, COL_CODE).unwrap_or_default().to_string(),
                name: row.get(headers, COL_NAME).unwrap_or_default().to_string(),
                return_3y,
                fee: numeric(row, COL_FEE),
                scale: numeric(row, COL_SCALE),
                horizons: horizons
                    .iter()
                    .map(|h| (*h, numeric(row, h.label())))
                    .collect(),
            })
        })
        .collect();

    debug!(
        rows = rows.len(),
        eligible = records.len(),
        dropped = rows.len() - records.len(),
        horizons = ?horizons,
        "Cleaned ranking rows"
    );
    records
}
