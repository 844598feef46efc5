#![allow(dead_code)]

use chrono::NaiveDate;
use symbol_aggregator::domain::error::AggregatorError;
use symbol_aggregator::domain::index_catalog::IndexInfo;
use symbol_aggregator::domain::metadata::SymbolMetadata;
pub use symbol_aggregator::domain::price::PriceObservation;
use symbol_aggregator::domain::table::Table;
use symbol_aggregator::ports::constituent_port::ConstituentPort;
use symbol_aggregator::ports::pacer_port::Pacer;
use symbol_aggregator::ports::price_port::PriceHistoryPort;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub struct MockPriceSource {
    pub data: HashMap<String, Vec<PriceObservation>>,
    pub metadata: HashMap<String, SymbolMetadata>,
    pub errors: HashMap<String, String>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            metadata: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_history(mut self, symbol: &str, observations: Vec<PriceObservation>) -> Self {
        self.data.insert(symbol.to_string(), observations);
        self
    }

    pub fn with_metadata(mut self, symbol: &str, metadata: SymbolMetadata) -> Self {
        self.metadata.insert(symbol.to_string(), metadata);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceHistoryPort for MockPriceSource {
    fn get_history(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceObservation>, AggregatorError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(AggregatorError::unavailable(symbol, reason));
        }
        Ok(self
            .data
            .get(symbol)
            .map(|obs| {
                obs.iter()
                    .filter(|o| start.is_none_or(|s| o.date >= s) && end.is_none_or(|e| o.date <= e))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_metadata(&self, symbol: &str) -> Result<SymbolMetadata, AggregatorError> {
        Ok(self.metadata.get(symbol).cloned().unwrap_or_default())
    }
}

pub struct MockConstituentSource {
    pub table: Table,
}

impl ConstituentPort for MockConstituentSource {
    fn fetch_table(&self, _index: &IndexInfo) -> Result<Table, AggregatorError> {
        Ok(self.table.clone())
    }
}

/// Records every wait instead of sleeping.
#[derive(Default)]
pub struct RecordingPacer {
    pub waits: Mutex<usize>,
    pub backoffs: Mutex<Vec<Duration>>,
}

impl Pacer for RecordingPacer {
    fn wait(&self) {
        *self.waits.lock().unwrap() += 1;
    }

    fn backoff(&self, delay: Duration) {
        self.backoffs.lock().unwrap().push(delay);
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn obs(date_str: &str, close: f64) -> PriceObservation {
    PriceObservation::new(
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        close,
        1000,
    )
}

/// Daily observations with a small zig-zag so returns have variance.
pub fn generate_history(start_date: &str, count: usize, start_price: f64) -> Vec<PriceObservation> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let wiggle = if i % 2 == 0 { 0.5 } else { -0.5 };
            PriceObservation::new(
                start + chrono::Duration::days(i as i64),
                start_price + i as f64 + wiggle,
                1000,
            )
        })
        .collect()
}
