//! Source-driven metrics for one symbol.
//!
//! Discovers the first trading date from the full history, reconciles the
//! requested window against it, fetches the window and metadata, then hands
//! everything to the pure engine in [`crate::domain::metrics`].

use crate::domain::error::AggregatorError;
use crate::domain::metrics::{MetricsInput, SymbolMetrics};
use crate::domain::price::{PriceHistory, ReturnSeries};
use crate::domain::settings::MetricsConfig;
use crate::ports::price_port::PriceHistoryPort;
use chrono::NaiveDate;

pub fn compute_metrics(
    source: &dyn PriceHistoryPort,
    symbol: &str,
    requested_start: NaiveDate,
    requested_end: NaiveDate,
    benchmark: &ReturnSeries,
    config: &MetricsConfig,
) -> Result<SymbolMetrics, AggregatorError> {
    let no_data = || AggregatorError::NoData {
        symbol: symbol.to_string(),
    };

    let full = PriceHistory::new(source.get_history(symbol, None, None)?);
    let first_trading_date = full.first_date().ok_or_else(no_data)?;

    let effective_start = requested_start.max(first_trading_date);
    if requested_start < first_trading_date {
        tracing::info!(
            symbol,
            %first_trading_date,
            %requested_start,
            "started trading after requested start, adjusting window"
        );
    }

    let history = PriceHistory::new(source.get_history(
        symbol,
        Some(effective_start),
        Some(requested_end),
    )?)
    .window(effective_start, requested_end);
    if history.is_empty() {
        return Err(no_data());
    }

    let metadata = source.get_metadata(symbol)?;

    let input = MetricsInput {
        symbol,
        history: &history,
        first_trading_date,
        requested_start,
        requested_end,
        metadata: &metadata,
        benchmark,
    };
    SymbolMetrics::compute(&input, config).ok_or_else(no_data)
}

/// Daily returns of the benchmark over `[start, end]`.
pub fn benchmark_returns(
    source: &dyn PriceHistoryPort,
    benchmark: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ReturnSeries, AggregatorError> {
    let history =
        PriceHistory::new(source.get_history(benchmark, Some(start), Some(end))?).window(start, end);
    if history.is_empty() {
        return Err(AggregatorError::NoData {
            symbol: benchmark.to_string(),
        });
    }
    Ok(history.daily_returns())
}
