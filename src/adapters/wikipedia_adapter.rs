//! Constituent lists scraped from Wikipedia article tables.

use crate::domain::error::AggregatorError;
use crate::domain::index_catalog::IndexInfo;
use crate::domain::settings::SourceConfig;
use crate::domain::table::Table;
use crate::ports::constituent_port::ConstituentPort;
use scraper::{ElementRef, Html, Selector};

pub struct WikipediaAdapter {
    client: reqwest::blocking::Client,
}

impl WikipediaAdapter {
    pub fn new(config: &SourceConfig) -> Result<Self, AggregatorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| AggregatorError::unavailable("*", format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl ConstituentPort for WikipediaAdapter {
    fn fetch_table(&self, index: &IndexInfo) -> Result<Table, AggregatorError> {
        tracing::info!(index = index.name, url = index.url, "fetching constituents");
        let response = self
            .client
            .get(index.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| AggregatorError::unavailable(index.name, e))?;
        let html = response
            .text()
            .map_err(|e| AggregatorError::unavailable(index.name, e))?;
        select_table(&html, index.table_index)
    }
}

fn selector(css: &str) -> Result<Selector, AggregatorError> {
    Selector::parse(css).map_err(|e| AggregatorError::Table {
        reason: format!("bad selector {}: {}", css, e),
    })
}

/// The `n`th `<table>` of the document (zero-based, nested tables included).
pub fn select_table(html: &str, n: usize) -> Result<Table, AggregatorError> {
    let tables = parse_tables(html)?;
    let found = tables.len();
    tables.into_iter().nth(n).ok_or_else(|| AggregatorError::Table {
        reason: format!("page has {} tables, wanted table {}", found, n),
    })
}

/// Every `<table>` of the document, in order. The first row made only of
/// `<th>` cells becomes the header; tables without one get numbered headers.
pub fn parse_tables(html: &str) -> Result<Vec<Table>, AggregatorError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let mut tables = Vec::new();
    for table in document.select(&table_sel) {
        let mut headers: Option<Vec<String>> = None;
        let mut rows = Vec::new();

        for row in table.select(&row_sel) {
            let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
            if cells.is_empty() {
                continue;
            }
            let all_th = cells.iter().all(|c| c.value().name() == "th");
            let values: Vec<String> = cells.iter().map(cell_text).collect();
            if headers.is_none() && all_th {
                headers = Some(values);
            } else if !all_th {
                rows.push(values);
            }
        }

        let headers = headers.unwrap_or_else(|| {
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            (0..width).map(|i| i.to_string()).collect()
        });
        tables.push(Table::new(headers, rows));
    }
    Ok(tables)
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
