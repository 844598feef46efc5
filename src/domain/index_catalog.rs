//! Supported market indices and where their constituent tables live.

use crate::domain::error::AggregatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: &'static str,
    pub url: &'static str,
    /// Zero-based position of the constituents table among the page's tables.
    pub table_index: usize,
    /// Suffix the market-data source expects on this index's tickers.
    pub ticker_suffix: Option<&'static str>,
}

pub const INDICES: &[IndexInfo] = &[
    IndexInfo {
        name: "S&P 500",
        url: "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies",
        table_index: 0,
        ticker_suffix: None,
    },
    IndexInfo {
        name: "Dow Jones",
        url: "https://en.wikipedia.org/wiki/Dow_Jones_Industrial_Average",
        table_index: 2,
        ticker_suffix: None,
    },
    IndexInfo {
        name: "NASDAQ 100",
        url: "https://en.wikipedia.org/wiki/NASDAQ-100",
        table_index: 4,
        ticker_suffix: None,
    },
    // The article lists only a sample of the index.
    IndexInfo {
        name: "Russell 2000",
        url: "https://en.wikipedia.org/wiki/Russell_2000_Index",
        table_index: 2,
        ticker_suffix: None,
    },
    IndexInfo {
        name: "FTSE 100",
        url: "https://en.wikipedia.org/wiki/FTSE_100_Index",
        table_index: 4,
        ticker_suffix: Some(".L"),
    },
    // Tickers already carry their .DE suffix.
    IndexInfo {
        name: "DAX",
        url: "https://en.wikipedia.org/wiki/DAX",
        table_index: 4,
        ticker_suffix: None,
    },
];

/// Resolves an index by name (case-insensitive) or by 1-based menu number.
pub fn find_index(choice: &str) -> Result<&'static IndexInfo, AggregatorError> {
    let choice = choice.trim();
    if let Ok(n) = choice.parse::<usize>() {
        if (1..=INDICES.len()).contains(&n) {
            return Ok(&INDICES[n - 1]);
        }
    }
    INDICES
        .iter()
        .find(|info| info.name.eq_ignore_ascii_case(choice))
        .ok_or_else(|| AggregatorError::UnsupportedIndex {
            name: choice.to_string(),
        })
}

/// `"S&P 500"` → `"S&P_500_constituents.csv"`.
pub fn constituents_file_name(index: &IndexInfo) -> String {
    format!("{}_constituents.csv", index.name.replace(' ', "_"))
}
