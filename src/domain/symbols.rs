//! Symbol lists: parsing user input and normalising scraped tickers for the
//! market-data source.

use crate::domain::error::AggregatorError;
use crate::domain::index_catalog::IndexInfo;
use crate::domain::table::Table;
use crate::ports::constituent_port::ConstituentPort;
use std::collections::HashSet;

/// Header names that hold tickers in constituent tables, in lookup order.
pub const TICKER_COLUMNS: &[&str] = &["Ticker", "Symbol"];

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SymbolsError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("symbol list is empty")]
    Empty,
}

/// Parses a comma-separated list like `"aapl, msft,BRK-B"`.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, SymbolsError> {
    if input.trim().is_empty() {
        return Err(SymbolsError::Empty);
    }

    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(SymbolsError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(SymbolsError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Class-share separators use `-` at the data source (`BRK.B` → `BRK-B`).
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().replace('.', "-")
}

/// Name of the ticker column of a constituent table, if any.
pub fn ticker_column(table: &Table) -> Option<&'static str> {
    TICKER_COLUMNS
        .iter()
        .copied()
        .find(|name| table.column_index(name).is_some())
}

/// Rewrites the ticker column in place: hyphenates class separators, then
/// appends the index's exchange suffix when it has one.
pub fn normalize_constituents(table: &mut Table, index: &IndexInfo) {
    let Some(column) = ticker_column(table).and_then(|name| table.column_index(name)) else {
        tracing::warn!(index = index.name, "no Ticker or Symbol column to normalize");
        return;
    };

    match index.ticker_suffix {
        Some(suffix) => table.map_column(column, |t| format!("{}{}", normalize_ticker(t), suffix)),
        None => table.map_column(column, normalize_ticker),
    }
}

/// Fetches an index's constituent table and normalises its tickers.
pub fn fetch_constituents(
    source: &dyn ConstituentPort,
    index: &IndexInfo,
) -> Result<Table, AggregatorError> {
    let mut table = source.fetch_table(index)?;
    normalize_constituents(&mut table, index);
    tracing::info!(index = index.name, rows = table.row_count(), "fetched constituents");
    Ok(table)
}
