//! Per-symbol metrics engine.
//!
//! Pure computation from one symbol's price history, its metadata and the
//! shared benchmark return series. No I/O happens here; fetching and
//! effective-start reconciliation live in [`crate::domain::pipeline`].

use super::metadata::SymbolMetadata;
use super::price::{PriceHistory, ReturnSeries};
use super::settings::MetricsConfig;
use super::stats;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverage {
    pub window: usize,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMetrics {
    pub symbol: String,
    pub total_volume: u64,
    pub average_yearly_volume: f64,
    pub sector_industry: String,
    pub correlation_with_market: Option<f64>,
    pub beta: Option<f64>,
    pub dividend_pays: bool,
    pub pe_ratio: Option<f64>,
    pub moving_averages: Vec<MovingAverage>,
    pub max_drawdown: f64,
    pub sharpe_ratio: Option<f64>,
    pub incomplete_data: bool,
    pub data_range: String,
    pub first_trading_date: NaiveDate,
    pub historical_range: String,
}

/// Everything the engine needs for one symbol.
#[derive(Debug, Clone, Copy)]
pub struct MetricsInput<'a> {
    pub symbol: &'a str,
    /// Observations for `[effective_start, requested_end]`.
    pub history: &'a PriceHistory,
    pub first_trading_date: NaiveDate,
    pub requested_start: NaiveDate,
    pub requested_end: NaiveDate,
    pub metadata: &'a SymbolMetadata,
    pub benchmark: &'a ReturnSeries,
}

impl MetricsInput<'_> {
    pub fn effective_start(&self) -> NaiveDate {
        self.requested_start.max(self.first_trading_date)
    }

    pub fn is_incomplete(&self) -> bool {
        self.requested_start < self.first_trading_date
    }
}

impl SymbolMetrics {
    /// Returns `None` when the window holds no observations.
    pub fn compute(input: &MetricsInput<'_>, config: &MetricsConfig) -> Option<Self> {
        let effective_start = input.effective_start();
        let history = input.history.window(effective_start, input.requested_end);
        if history.is_empty() {
            return None;
        }

        let trading_days = config.trading_days_per_year as f64;
        let closes = history.closes();
        let total_volume: u64 = history.observations().iter().map(|o| o.volume).sum();
        let average_yearly_volume = total_volume as f64 / history.len() as f64 * trading_days;

        let moving_averages = config
            .sma_windows
            .iter()
            .map(|&window| MovingAverage {
                window,
                value: stats::trailing_sma(&closes, window),
            })
            .collect();

        let returns = history.daily_returns();
        let sharpe_ratio =
            stats::sharpe_ratio(&returns.values(), config.risk_free_rate_annual, trading_days);
        let correlation_with_market = stats::pearson(&returns.aligned_with(input.benchmark));

        Some(SymbolMetrics {
            symbol: input.symbol.to_string(),
            total_volume,
            average_yearly_volume,
            sector_industry: input.metadata.sector_industry(),
            correlation_with_market,
            beta: input.metadata.beta.filter(|b| b.is_finite()),
            dividend_pays: input.metadata.pays_dividend(),
            pe_ratio: input.metadata.trailing_pe.filter(|p| p.is_finite()),
            moving_averages,
            max_drawdown: stats::max_drawdown(&closes),
            sharpe_ratio,
            incomplete_data: input.is_incomplete(),
            data_range: stats::elapsed_range(effective_start, input.requested_end),
            first_trading_date: input.first_trading_date,
            historical_range: stats::elapsed_range(input.first_trading_date, input.requested_end),
        })
    }

    pub fn sma(&self, window: usize) -> Option<f64> {
        self.moving_averages
            .iter()
            .find(|m| m.window == window)
            .and_then(|m| m.value)
    }

    /// Named output columns in display order. Undefined values render empty.
    pub fn fields(&self) -> Vec<(String, String)> {
        let windows: Vec<usize> = self.moving_averages.iter().map(|m| m.window).collect();
        let mut values = vec![
            self.symbol.clone(),
            self.total_volume.to_string(),
            self.average_yearly_volume.to_string(),
            self.sector_industry.clone(),
            fmt_opt(self.correlation_with_market),
            fmt_opt(self.beta),
            if self.dividend_pays { "Yes" } else { "No" }.to_string(),
            fmt_opt(self.pe_ratio),
        ];
        values.extend(self.moving_averages.iter().map(|m| fmt_opt(m.value)));
        values.extend([
            self.max_drawdown.to_string(),
            fmt_opt(self.sharpe_ratio),
            self.incomplete_data.to_string(),
            self.data_range.clone(),
            self.first_trading_date.format("%Y-%m-%d").to_string(),
            self.historical_range.clone(),
        ]);
        metric_columns(&windows).into_iter().zip(values).collect()
    }
}

/// Column headers of [`SymbolMetrics::fields`] for the given SMA windows.
pub fn metric_columns(sma_windows: &[usize]) -> Vec<String> {
    let mut columns: Vec<String> = [
        "Symbol",
        "Total Volume",
        "Average Yearly Volume",
        "Sector/Industry",
        "Correlation with Market",
        "Beta",
        "Dividend Pays",
        "P/E Ratio",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    columns.extend(sma_windows.iter().map(|w| format!("SMA {}", w)));
    columns.extend(
        [
            "Max Drawdown",
            "Sharpe Ratio",
            "Incomplete Data",
            "Data Range",
            "First Trading Date",
            "Historical Range",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    columns
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
