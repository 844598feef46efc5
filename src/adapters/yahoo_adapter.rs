//! Yahoo Finance market-data adapter.
//!
//! Uses the public chart endpoint for daily closes and volumes and the
//! quote-summary endpoint for sector, industry, dividend, P/E and beta.
//! Timestamps are shifted by the exchange's GMT offset before taking the
//! calendar date, so bars land on exchange-local trading days.

use crate::domain::error::AggregatorError;
use crate::domain::metadata::SymbolMetadata;
use crate::domain::price::PriceObservation;
use crate::domain::settings::SourceConfig;
use crate::ports::price_port::PriceHistoryPort;
use chrono::{DateTime, NaiveDate};
use reqwest::StatusCode;
use serde::Deserialize;

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new(config: &SourceConfig) -> Result<Self, AggregatorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| AggregatorError::unavailable("*", format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Body of a successful GET, or `None` for 404.
    fn get_text(
        &self,
        symbol: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<String>, AggregatorError> {
        tracing::debug!(symbol, url, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| AggregatorError::unavailable(symbol, e))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(AggregatorError::RateLimited {
                symbol: symbol.to_string(),
            }),
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => {
                Err(AggregatorError::unavailable(symbol, format!("HTTP {}", status)))
            }
            _ => response
                .text()
                .map(Some)
                .map_err(|e| AggregatorError::unavailable(symbol, e)),
        }
    }
}

impl PriceHistoryPort for YahooAdapter {
    fn get_history(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceObservation>, AggregatorError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let mut query = vec![
            ("interval", "1d".to_string()),
            ("events", "history".to_string()),
        ];
        match (start, end) {
            (None, None) => query.push(("range", "max".to_string())),
            _ => {
                let period1 = start.map(unix_seconds).unwrap_or(0);
                // period2 is exclusive
                let period2 = end
                    .and_then(|e| e.succ_opt())
                    .map(unix_seconds)
                    .unwrap_or(i64::from(u32::MAX));
                query.push(("period1", period1.to_string()));
                query.push(("period2", period2.to_string()));
            }
        }

        let Some(body) = self.get_text(symbol, &url, &query)? else {
            return Ok(Vec::new());
        };
        let mut observations = parse_chart(symbol, &body)?;
        observations.retain(|o| start.is_none_or(|s| o.date >= s) && end.is_none_or(|e| o.date <= e));
        Ok(observations)
    }

    fn get_metadata(&self, symbol: &str) -> Result<SymbolMetadata, AggregatorError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
        let query = [("modules", "assetProfile,summaryDetail".to_string())];
        match self.get_text(symbol, &url, &query)? {
            Some(body) => parse_summary(symbol, &body),
            None => Ok(SymbolMetadata::default()),
        }
    }
}

fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Parses a chart response. Rows with a null close are skipped; a null
/// volume counts as zero. A "Not Found" error payload means no data.
pub(crate) fn parse_chart(symbol: &str, body: &str) -> Result<Vec<PriceObservation>, AggregatorError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| AggregatorError::unavailable(symbol, format!("invalid chart JSON: {}", e)))?;

    if let Some(error) = envelope.chart.error {
        if error.code.as_deref() == Some("Not Found") {
            return Ok(Vec::new());
        }
        return Err(AggregatorError::unavailable(
            symbol,
            error
                .description
                .or(error.code)
                .unwrap_or_else(|| "unknown chart error".to_string()),
        ));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let offset = result.meta.gmtoffset;
    let mut observations = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);
        let Some(local) = DateTime::from_timestamp(ts + offset, 0) else {
            tracing::warn!(symbol, timestamp = ts, "timestamp out of range");
            continue;
        };
        observations.push(PriceObservation::new(local.date_naive(), close, volume));
    }
    Ok(observations)
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    result: Option<Vec<SummaryResult>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    asset_profile: Option<AssetProfile>,
    #[serde(default)]
    summary_detail: Option<SummaryDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    dividend_yield: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    beta: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

pub(crate) fn parse_summary(symbol: &str, body: &str) -> Result<SymbolMetadata, AggregatorError> {
    let envelope: SummaryEnvelope = serde_json::from_str(body)
        .map_err(|e| AggregatorError::unavailable(symbol, format!("invalid summary JSON: {}", e)))?;
    let result = envelope
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .unwrap_or_default();
    let profile = result.asset_profile.unwrap_or_default();
    let detail = result.summary_detail.unwrap_or_default();

    Ok(SymbolMetadata {
        sector: profile.sector,
        industry: profile.industry,
        dividend_yield: raw(detail.dividend_yield),
        trailing_pe: raw(detail.trailing_pe),
        beta: raw(detail.beta),
    })
}
