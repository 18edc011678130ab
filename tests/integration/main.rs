//! Integration tests: the pagination driver against a scripted page, and
//! the full scrape → clean → score → persist pipeline.

mod mock_page;
mod pipeline;
