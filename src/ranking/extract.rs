//! Table extraction from rendered ranking pages.
//!
//! Pure parsing of already-fetched markup: no navigation, no waiting.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::types::{HeaderSet, RankingRow};

// Constant selectors: parsing cannot fail.
static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());

static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("No table with id '{0}' on the page")]
    NoTable(String),

    #[error("Header row has no non-empty labels")]
    NoHeaders,

    #[error("Invalid table id '{0}'")]
    InvalidTableId(String),
}

/// Result of parsing one page.
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    /// Headers captured from this page. Only set when no header set was
    /// supplied by the caller.
    pub headers: Option<HeaderSet>,
    /// Rows aligned to the header set, in page order.
    pub rows: Vec<RankingRow>,
    /// Table rows below the header row, before short rows were excluded.
    pub data_rows: usize,
}

impl PageExtract {
    /// Rows dropped for having fewer cells than headers.
    pub fn excluded(&self) -> usize {
        self.data_rows - self.rows.len()
    }
}

/// Find the table element with the given `id`.
pub fn locate_table<'a>(document: &'a Html, table_id: &str) -> Result<ElementRef<'a>, ExtractionError> {
    let selector = Selector::parse(&format!("table#{table_id}"))
        .map_err(|_| ExtractionError::InvalidTableId(table_id.to_string()))?;
    document
        .select(&selector)
        .next()
        .ok_or_else(|| ExtractionError::NoTable(table_id.to_string()))
}

/// Parse a rendered page into headers and rows.
///
/// The first `tr` of the table is the header row. Headers are read from it
/// only when `known_headers` is `None`; empty labels are skipped. Data rows
/// with fewer cells than the header count are excluded, longer rows are
/// truncated to the header length.
pub fn extract_page(
    html: &str,
    table_id: &str,
    known_headers: Option<&HeaderSet>,
) -> Result<PageExtract, ExtractionError> {
    let document = Html::parse_document(html);
    let table = locate_table(&document, table_id)?;

    let rows: Vec<ElementRef> = table.select(&ROW_SELECTOR).collect();
    let Some((header_row, data)) = rows.split_first() else {
        return Ok(PageExtract::default());
    };
    if data.is_empty() {
        return Ok(PageExtract::default());
    }

    let captured = match known_headers {
        Some(_) => None,
        None => {
            let headers = HeaderSet::new(row_cells(header_row));
            if headers.is_empty() {
                return Err(ExtractionError::NoHeaders);
            }
            debug!(headers = ?headers.labels(), "Captured header row");
            Some(headers)
        }
    };
    let width = known_headers
        .or(captured.as_ref())
        .map(HeaderSet::len)
        .unwrap_or_default();

    let mut extracted = Vec::with_capacity(data.len());
    for row in data {
        let mut cells = row_cells(row);
        if cells.is_empty() || cells.len() < width {
            continue;
        }
        cells.truncate(width);
        extracted.push(RankingRow::new(cells));
    }

    Ok(PageExtract {
        headers: captured,
        rows: extracted,
        data_rows: data.len(),
    })
}

/// Trimmed text of every `th`/`td` in a row.
fn row_cells(row: &ElementRef) -> Vec<String> {
    row.select(&CELL_SELECTOR)
        .map(|cell| cell.text().map(str::trim).collect::<String>())
        .collect()
}
