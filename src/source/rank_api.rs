//! Live ranking data endpoint.
//!
//! The ranking page's own table script pulls its rows from
//! `rankhandler.aspx`, which answers with a JavaScript assignment rather
//! than JSON:
//!
//! ```text
//! var rankData = {datas:["000001,名称,MC,2025-07-01,1.2340,...", ...],allRecords:1234,pageIndex:1,pageNum:50,allPages:25,...};
//! ```
//!
//! Each entry of `datas` is one comma-separated fund row. Rows are mapped
//! onto the same column labels the rendered page table uses, so the
//! cleaner treats both sources alike.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::RowSource;
use crate::config::{ApiConfig, ScraperConfig};
use crate::ranking::RandomDelay;
use crate::types::{Category, HeaderSet, RankingRow, RankingTable};

/// `(field index in a datas entry, column label)`.
const FIELDS: &[(usize, &str)] = &[
    (0, "基金代码"),
    (1, "基金简称"),
    (3, "日期"),
    (4, "单位净值"),
    (5, "累计净值"),
    (6, "日增长率"),
    (7, "近1周"),
    (8, "近1月"),
    (9, "近3月"),
    (10, "近6月"),
    (11, "近1年"),
    (12, "近2年"),
    (13, "近3年"),
    (14, "今年来"),
    (15, "成立来"),
    (20, "手续费"),
];

/// One decoded response page.
#[derive(Debug, Clone, PartialEq)]
pub struct RankPage {
    pub rows: Vec<RankingRow>,
    pub all_pages: usize,
}

pub fn headers() -> HeaderSet {
    HeaderSet::new(FIELDS.iter().map(|(_, label)| *label))
}

/// Decode a `var rankData = {...}` body.
pub fn parse_rank_data(body: &str) -> Result<RankPage> {
    let start = body
        .find("datas:[")
        .ok_or_else(|| anyhow!("Response has no datas array"))?
        + "datas:[".len();
    let len = body[start..]
        .find(']')
        .ok_or_else(|| anyhow!("Unterminated datas array"))?;
    let entries: Vec<String> = serde_json::from_str(&format!("[{}]", &body[start..start + len]))
        .context("Failed to parse datas array")?;

    let rows = entries
        .iter()
        .map(|entry| {
            let fields: Vec<&str> = entry.split(',').collect();
            RankingRow::new(
                FIELDS
                    .iter()
                    .map(|(i, _)| fields.get(*i).map(|f| f.trim()).unwrap_or_default().to_string())
                    .collect(),
            )
        })
        .collect();

    Ok(RankPage {
        rows,
        all_pages: scalar_field(body, "allPages").unwrap_or(1),
    })
}

fn scalar_field(body: &str, key: &str) -> Option<usize> {
    let start = body.find(&format!("{key}:"))? + key.len() + 1;
    let digits: String = body[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct RankApiSource {
    http: Client,
    api: ApiConfig,
    scraper: ScraperConfig,
}

impl RankApiSource {
    pub fn new(api: ApiConfig, scraper: ScraperConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(&scraper.user_agent)
            .build()
            .context("Failed to build HTTP client for ranking endpoint")?;
        Ok(Self { http, api, scraper })
    }

    fn page_url(&self, category: Category, page: usize) -> String {
        format!(
            "{endpoint}?op=ph&dt=kf&ft={ft}&rs=&gs=0&sc={sc}&st={st}&sd={sd}&ed={ed}\
             &qdii=&tabSubtype=,,,,,&pi={page}&pn={pn}&dx=1&v={v}",
            endpoint = self.api.endpoint,
            ft = category.api_code(),
            sc = urlencoding::encode(&self.scraper.sort_field),
            st = urlencoding::encode(&self.scraper.sort_direction),
            sd = urlencoding::encode(&self.scraper.start_date),
            ed = urlencoding::encode(&self.scraper.end_date),
            pn = self.api.page_size,
            v = fastrand::f64(),
        )
    }

    async fn fetch_page(&self, category: Category, page: usize) -> Result<RankPage> {
        let url = self.page_url(category, page);
        debug!(url = %url, "Fetching ranking page");

        let body = self
            .http
            .get(&url)
            .header(REFERER, &self.api.referer)
            .send()
            .await
            .context("Ranking endpoint request failed")?
            .error_for_status()
            .context("Ranking endpoint returned an error status")?
            .text()
            .await
            .context("Failed to read ranking endpoint response")?;

        parse_rank_data(&body)
    }
}

#[async_trait]
impl RowSource for RankApiSource {
    fn name(&self) -> &str {
        "api"
    }

    /// Pages through the endpoint until `allPages` or `max_pages`. A failed
    /// later page keeps the rows fetched so far.
    async fn fetch(&self, category: Category) -> Result<RankingTable> {
        let (min, max) = self.scraper.delay_range();
        let mut delay = RandomDelay::new(min, max);

        let first = self.fetch_page(category, 1).await?;
        let last_page = first.all_pages.min(self.scraper.max_pages).max(1);
        let mut rows = first.rows;
        info!(category = category.code(), pages = last_page, rows = rows.len(), "Ranking page 1 fetched");

        for page in 2..=last_page {
            tokio::time::sleep(delay.sample()).await;
            match self.fetch_page(category, page).await {
                Ok(next) if next.rows.is_empty() => break,
                Ok(next) => {
                    rows.extend(next.rows);
                    debug!(category = category.code(), page, total = rows.len(), "Ranking page fetched");
                }
                Err(e) => {
                    warn!(category = category.code(), page, error = %e, "Ranking page failed, keeping rows so far");
                    break;
                }
            }
        }

        info!(category = category.code(), rows = rows.len(), "Live ranking fetched");
        Ok(RankingTable::new(headers(), rows))
    }
}
