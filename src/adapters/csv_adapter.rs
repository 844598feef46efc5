//! CSV file adapters: a local price source and spreadsheet table I/O.

use crate::domain::error::AggregatorError;
use crate::domain::metadata::SymbolMetadata;
use crate::domain::price::PriceObservation;
use crate::domain::table::Table;
use crate::ports::price_port::PriceHistoryPort;
use crate::ports::table_port::TablePort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads `{base}/{SYMBOL}.csv` (`date,close,volume`) and an optional
/// `{base}/metadata.csv` (`symbol,sector,industry,dividend_yield,trailing_pe,beta`).
pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// The symbol must name a file directly inside the base directory.
    fn csv_path(&self, symbol: &str) -> Result<PathBuf, AggregatorError> {
        if symbol.is_empty() || symbol.contains(['/', '\\']) {
            return Err(AggregatorError::invalid_input(format!(
                "symbol '{}' cannot be used as a file name",
                symbol
            )));
        }
        Ok(self.base_path.join(format!("{}.csv", symbol)))
    }

    fn parse_error(symbol: &str, detail: impl std::fmt::Display) -> AggregatorError {
        AggregatorError::MalformedData {
            symbol: symbol.to_string(),
            reason: format!("CSV parse error: {}", detail),
        }
    }
}

impl PriceHistoryPort for CsvPriceAdapter {
    fn get_history(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceObservation>, AggregatorError> {
        let path = self.csv_path(symbol)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no price file");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AggregatorError::unavailable(
                    symbol,
                    format!("failed to read {}: {}", path.display(), e),
                ))
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut observations = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| Self::parse_error(symbol, e))?;

            let date_str = record
                .get(0)
                .ok_or_else(|| Self::parse_error(symbol, "missing date column"))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| Self::parse_error(symbol, format!("invalid date format: {}", e)))?;

            if start.is_some_and(|s| date < s) || end.is_some_and(|e| date > e) {
                continue;
            }

            let close: f64 = record
                .get(1)
                .ok_or_else(|| Self::parse_error(symbol, "missing close column"))?
                .trim()
                .parse()
                .map_err(|e| Self::parse_error(symbol, format!("invalid close value: {}", e)))?;

            let volume: u64 = record
                .get(2)
                .ok_or_else(|| Self::parse_error(symbol, "missing volume column"))?
                .trim()
                .parse()
                .map_err(|e| Self::parse_error(symbol, format!("invalid volume value: {}", e)))?;

            observations.push(PriceObservation::new(date, close, volume));
        }

        observations.sort_by_key(|o| o.date);
        Ok(observations)
    }

    fn get_metadata(&self, symbol: &str) -> Result<SymbolMetadata, AggregatorError> {
        let path = self.base_path.join("metadata.csv");
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SymbolMetadata::default()),
            Err(e) => return Err(AggregatorError::unavailable(symbol, e)),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        for result in rdr.records() {
            let record = result.map_err(|e| Self::parse_error(symbol, e))?;
            if !record
                .get(0)
                .is_some_and(|s| s.trim().eq_ignore_ascii_case(symbol))
            {
                continue;
            }
            let text = |i: usize| {
                record
                    .get(i)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            let number = |i: usize| record.get(i).and_then(|s| s.trim().parse::<f64>().ok());
            return Ok(SymbolMetadata {
                sector: text(1),
                industry: text(2),
                dividend_yield: number(3),
                trailing_pe: number(4),
                beta: number(5),
            });
        }
        Ok(SymbolMetadata::default())
    }
}

/// Spreadsheet files as CSV with a header row.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvTableAdapter;

impl CsvTableAdapter {
    pub fn parse(content: &str) -> Result<Table, AggregatorError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(table_error)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(table_error)?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Table::new(headers, rows))
    }

    pub fn render(table: &Table) -> Result<String, AggregatorError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&table.headers).map_err(table_error)?;
        for row in &table.rows {
            wtr.write_record(row).map_err(table_error)?;
        }
        let bytes = wtr.into_inner().map_err(|e| AggregatorError::Table {
            reason: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| AggregatorError::Table {
            reason: e.to_string(),
        })
    }
}

fn table_error(e: csv::Error) -> AggregatorError {
    AggregatorError::Table {
        reason: format!("CSV error: {}", e),
    }
}

impl TablePort for CsvTableAdapter {
    fn read_table(&self, path: &Path) -> Result<Table, AggregatorError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    fn write_table(&self, path: &Path, table: &Table) -> Result<(), AggregatorError> {
        fs::write(path, Self::render(table)?)?;
        tracing::info!(path = %path.display(), rows = table.row_count(), "wrote table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,close,volume\n\
            2024-01-17,115.0,55000\n\
            2024-01-15,105.0,50000\n\
            2024-01-16,110.0,60000\n";

        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        fs::write(path.join("BAD.csv"), "date,close,volume\n2024-13-01,1,1\n").unwrap();
        fs::write(
            path.join("metadata.csv"),
            "symbol,sector,industry,dividend_yield,trailing_pe,beta\n\
             BHP,Materials,Mining,0.05,11.2,0.9\n\
             XYZ,,,,,\n",
        )
        .unwrap();

        (dir, path)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn get_history_returns_sorted_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);

        let obs = adapter.get_history("BHP", None, None).unwrap();

        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].date, d(2024, 1, 15));
        assert_eq!(obs[0].close, 105.0);
        assert_eq!(obs[0].volume, 50000);
        assert_eq!(obs[2].date, d(2024, 1, 17));
    }

    #[test]
    fn get_history_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);

        let obs = adapter
            .get_history("BHP", Some(d(2024, 1, 16)), Some(d(2024, 1, 16)))
            .unwrap();

        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].date, d(2024, 1, 16));
    }

    #[test]
    fn missing_file_is_empty_history() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);
        assert!(adapter.get_history("XYZ", None, None).unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_not_retryable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);
        let err = adapter.get_history("BAD", None, None).unwrap_err();
        assert!(matches!(err, AggregatorError::MalformedData { ref symbol, .. } if symbol == "BAD"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn symbol_cannot_leave_data_dir() {
        let dir = TempDir::new().unwrap();
        let prices = dir.path().join("prices");
        fs::create_dir(&prices).unwrap();
        fs::write(dir.path().join("secret.csv"), "date,close,volume\n2024-01-02,1.0,1\n").unwrap();
        let adapter = CsvPriceAdapter::new(prices);

        for symbol in ["../secret", "sub/AAPL", "..\\secret", ""] {
            assert!(
                matches!(
                    adapter.get_history(symbol, None, None),
                    Err(AggregatorError::InvalidInput { .. })
                ),
                "{symbol} accepted"
            );
        }
    }

    #[test]
    fn metadata_lookup() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);

        let meta = adapter.get_metadata("bhp").unwrap();
        assert_eq!(meta.sector.as_deref(), Some("Materials"));
        assert_eq!(meta.industry.as_deref(), Some("Mining"));
        assert_eq!(meta.trailing_pe, Some(11.2));
        assert!(meta.pays_dividend());

        let blank = adapter.get_metadata("XYZ").unwrap();
        assert_eq!(blank, SymbolMetadata::default());
        assert_eq!(adapter.get_metadata("NOPE").unwrap(), SymbolMetadata::default());
    }

    #[test]
    fn table_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let table = Table::new(
            vec!["Symbol".into(), "Security".into()],
            vec![vec!["BRK-B".into(), "Berkshire, Inc.".into()]],
        );

        CsvTableAdapter.write_table(&path, &table).unwrap();
        let back = CsvTableAdapter.read_table(&path).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn ragged_rows_are_padded() {
        let table = CsvTableAdapter::parse("Symbol,Name\nAAPL\nMSFT,Microsoft\n").unwrap();
        assert_eq!(table.rows[0], vec!["AAPL".to_string(), String::new()]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn missing_table_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            CsvTableAdapter.read_table(&dir.path().join("nope.csv")),
            Err(AggregatorError::Io(_))
        ));
    }
}
