//! Typed settings built from the config port, with validation.
//!
//! Every key is optional; defaults reproduce the behaviour of the interactive
//! tool (2% risk-free rate, 252 trading days, SMA 50/200, `^GSPC` benchmark,
//! roughly one to two seconds between symbols).

use crate::domain::error::AggregatorError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::time::Duration;

pub const DEFAULT_BENCHMARK: &str = "^GSPC";
pub const DEFAULT_SYMBOL_COLUMN: &str = "Symbol";
pub const DEFAULT_START_DATE: &str = "2001-01-01";
pub const DEFAULT_END_DATE: &str = "2024-12-31";
pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) symbol-aggregator";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    pub risk_free_rate_annual: f64,
    pub trading_days_per_year: u32,
    pub sma_windows: Vec<usize>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate_annual: 0.02,
            trading_days_per_year: 252,
            sma_windows: vec![50, 200],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PacingConfig {
    pub enabled: bool,
    pub min_delay: Duration,
    pub jitter: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay: Duration::from_millis(1000),
            jitter: Duration::from_millis(1000),
            max_retries: 2,
            backoff: Duration::from_millis(2000),
        }
    }
}

impl PacingConfig {
    /// Wait before retry `attempt` (1-based): `backoff * 2^(attempt - 1)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchDefaults {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub benchmark: String,
    pub symbol_column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub provider: SourceKind,
    /// Directory of `{SYMBOL}.csv` files for the CSV provider.
    pub data_dir: String,
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            provider: SourceKind::Yahoo,
            data_dir: "data".to_string(),
            base_url: DEFAULT_YAHOO_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub metrics: MetricsConfig,
    pub pacing: PacingConfig,
    pub batch: BatchDefaults,
    pub source: SourceConfig,
    /// Bind address for `serve`.
    pub listen: String,
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AggregatorError> {
        let defaults = MetricsConfig::default();
        let risk_free_rate_annual =
            config.get_double("metrics", "risk_free_rate", defaults.risk_free_rate_annual);
        if !(0.0..1.0).contains(&risk_free_rate_annual) {
            return Err(invalid(
                "metrics",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }

        let trading_days = config.get_int(
            "metrics",
            "trading_days_per_year",
            defaults.trading_days_per_year as i64,
        );
        if !(1..=366).contains(&trading_days) {
            return Err(invalid(
                "metrics",
                "trading_days_per_year",
                "trading_days_per_year must be between 1 and 366",
            ));
        }

        let sma_windows = match config.get_string("metrics", "sma_windows") {
            Some(raw) => parse_windows(&raw)?,
            None => defaults.sma_windows,
        };

        let pacing = PacingConfig {
            enabled: config.get_bool("pacing", "enabled", true),
            min_delay: millis(config, "min_delay_ms", 1000)?,
            jitter: millis(config, "jitter_ms", 1000)?,
            max_retries: {
                let value = config.get_int("pacing", "max_retries", 2);
                if !(0..=10).contains(&value) {
                    return Err(invalid(
                        "pacing",
                        "max_retries",
                        "max_retries must be between 0 and 10",
                    ));
                }
                value as u32
            },
            backoff: millis(config, "backoff_ms", 2000)?,
        };

        let start_date = date_or(config, "start_date", DEFAULT_START_DATE)?;
        let end_date = date_or(config, "end_date", DEFAULT_END_DATE)?;
        validate_range(start_date, end_date)?;

        let batch = BatchDefaults {
            start_date,
            end_date,
            benchmark: config
                .get_string("batch", "benchmark")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string()),
            symbol_column: config
                .get_string("batch", "symbol_column")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SYMBOL_COLUMN.to_string()),
        };

        let source = source_config(config)?;
        let listen = config
            .get_string("web", "listen")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());

        Ok(Settings {
            metrics: MetricsConfig {
                risk_free_rate_annual,
                trading_days_per_year: trading_days as u32,
                sma_windows,
            },
            pacing,
            batch,
            source,
            listen,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            metrics: MetricsConfig::default(),
            pacing: PacingConfig::default(),
            batch: BatchDefaults {
                start_date: parse_date(DEFAULT_START_DATE).unwrap_or_default(),
                end_date: parse_date(DEFAULT_END_DATE).unwrap_or_default(),
                benchmark: DEFAULT_BENCHMARK.to_string(),
                symbol_column: DEFAULT_SYMBOL_COLUMN.to_string(),
            },
            source: SourceConfig::default(),
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Rejects a window whose start lies after its end.
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), AggregatorError> {
    if start > end {
        return Err(AggregatorError::invalid_input(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }
    Ok(())
}

fn source_config(config: &dyn ConfigPort) -> Result<SourceConfig, AggregatorError> {
    let defaults = SourceConfig::default();
    let provider = match config
        .get_string("source", "provider")
        .map(|p| p.trim().to_lowercase())
        .as_deref()
    {
        None | Some("yahoo") => SourceKind::Yahoo,
        Some("csv") => SourceKind::Csv,
        Some(other) => {
            return Err(invalid(
                "source",
                "provider",
                &format!("unknown provider '{}', expected yahoo or csv", other),
            ))
        }
    };

    let timeout_secs = config.get_int("source", "timeout_secs", 30);
    if timeout_secs <= 0 {
        return Err(invalid("source", "timeout_secs", "timeout_secs must be positive"));
    }

    let non_empty = |key: &str, default: String| {
        config
            .get_string("source", key)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(default)
    };

    Ok(SourceConfig {
        provider,
        data_dir: non_empty("data_dir", defaults.data_dir),
        base_url: non_empty("base_url", defaults.base_url)
            .trim_end_matches('/')
            .to_string(),
        timeout: Duration::from_secs(timeout_secs as u64),
        user_agent: non_empty("user_agent", defaults.user_agent),
    })
}

fn parse_windows(raw: &str) -> Result<Vec<usize>, AggregatorError> {
    let mut windows = Vec::new();
    for token in raw.split(',') {
        let window: usize = token.trim().parse().map_err(|_| {
            invalid(
                "metrics",
                "sma_windows",
                &format!("'{}' is not a positive integer", token.trim()),
            )
        })?;
        if window == 0 {
            return Err(invalid(
                "metrics",
                "sma_windows",
                "SMA windows must be positive",
            ));
        }
        windows.push(window);
    }
    Ok(windows)
}

fn millis(config: &dyn ConfigPort, key: &str, default: i64) -> Result<Duration, AggregatorError> {
    let value = config.get_int("pacing", key, default);
    if value < 0 {
        return Err(invalid(
            "pacing",
            key,
            &format!("{} must be non-negative", key),
        ));
    }
    Ok(Duration::from_millis(value as u64))
}

fn date_or(config: &dyn ConfigPort, key: &str, default: &str) -> Result<NaiveDate, AggregatorError> {
    let raw = config
        .get_string("batch", key)
        .unwrap_or_else(|| default.to_string());
    parse_date(&raw).ok_or_else(|| {
        invalid(
            "batch",
            key,
            &format!("invalid {} format, expected YYYY-MM-DD", key),
        )
    })
}

fn invalid(section: &str, key: &str, reason: &str) -> AggregatorError {
    AggregatorError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn settings(ini: &str) -> Result<Settings, AggregatorError> {
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        Settings::from_config(&adapter)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let s = settings("").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.metrics.sma_windows, vec![50, 200]);
        assert_eq!(s.batch.benchmark, "^GSPC");
        assert_eq!(s.batch.start_date, NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());
    }

    #[test]
    fn overrides_are_applied() {
        let s = settings(
            "[metrics]\nrisk_free_rate = 0.04\ntrading_days_per_year = 250\nsma_windows = 20, 100\n\
             [pacing]\nenabled = false\nmin_delay_ms = 0\nmax_retries = 0\n\
             [batch]\nbenchmark = ^FTSE\nstart_date = 2015-01-01\nend_date = 2020-01-01\n",
        )
        .unwrap();
        assert_eq!(s.metrics.risk_free_rate_annual, 0.04);
        assert_eq!(s.metrics.trading_days_per_year, 250);
        assert_eq!(s.metrics.sma_windows, vec![20, 100]);
        assert!(!s.pacing.enabled);
        assert_eq!(s.pacing.min_delay, Duration::ZERO);
        assert_eq!(s.pacing.max_retries, 0);
        assert_eq!(s.batch.benchmark, "^FTSE");
    }

    #[test]
    fn rejects_zero_sma_window() {
        let err = settings("[metrics]\nsma_windows = 50,0\n").unwrap_err();
        assert!(matches!(err, AggregatorError::ConfigInvalid { key, .. } if key == "sma_windows"));
    }

    #[test]
    fn rejects_bad_risk_free_rate() {
        let err = settings("[metrics]\nrisk_free_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, AggregatorError::ConfigInvalid { key, .. } if key == "risk_free_rate"));
    }

    #[test]
    fn rejects_negative_delay() {
        let err = settings("[pacing]\njitter_ms = -5\n").unwrap_err();
        assert!(matches!(err, AggregatorError::ConfigInvalid { key, .. } if key == "jitter_ms"));
    }

    #[test]
    fn rejects_inverted_range() {
        let err =
            settings("[batch]\nstart_date = 2024-01-01\nend_date = 2020-01-01\n").unwrap_err();
        assert!(matches!(err, AggregatorError::InvalidInput { .. }));
    }

    #[test]
    fn rejects_malformed_date() {
        let err = settings("[batch]\nstart_date = 2020/01/01\n").unwrap_err();
        assert!(matches!(err, AggregatorError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn source_section() {
        let s = settings(
            "[source]\nprovider = CSV\ndata_dir = /tmp/prices\nbase_url = http://localhost:9000/\ntimeout_secs = 5\n\
             [web]\nlisten = 0.0.0.0:8080\n",
        )
        .unwrap();
        assert_eq!(s.source.provider, SourceKind::Csv);
        assert_eq!(s.source.data_dir, "/tmp/prices");
        assert_eq!(s.source.base_url, "http://localhost:9000");
        assert_eq!(s.source.timeout, Duration::from_secs(5));
        assert_eq!(s.listen, "0.0.0.0:8080");
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = settings("[source]\nprovider = bloomberg\n").unwrap_err();
        assert!(matches!(err, AggregatorError::ConfigInvalid { key, .. } if key == "provider"));
    }

    #[test]
    fn backoff_doubles() {
        let pacing = PacingConfig {
            backoff: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(pacing.backoff_for(1), Duration::from_millis(100));
        assert_eq!(pacing.backoff_for(2), Duration::from_millis(200));
        assert_eq!(pacing.backoff_for(3), Duration::from_millis(400));
    }
}
