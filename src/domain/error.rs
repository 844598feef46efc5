//! Domain error types.

/// Top-level error type for symbol-aggregator.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("data source unavailable for {symbol}: {reason}")]
    SourceUnavailable { symbol: String, reason: String },

    /// Local data that cannot be parsed. Re-reading will not help.
    #[error("malformed data for {symbol}: {reason}")]
    MalformedData { symbol: String, reason: String },

    #[error("rate limited while fetching {symbol}")]
    RateLimited { symbol: String },

    #[error("index '{name}' is not supported")]
    UnsupportedIndex { name: String },

    #[error("table error: {reason}")]
    Table { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AggregatorError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn unavailable(symbol: &str, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Transient upstream failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AggregatorError::SourceUnavailable { .. } | AggregatorError::RateLimited { .. }
        )
    }
}

impl From<&AggregatorError> for std::process::ExitCode {
    fn from(err: &AggregatorError) -> Self {
        let code: u8 = match err {
            AggregatorError::Io(_) => 1,
            AggregatorError::ConfigParse { .. }
            | AggregatorError::ConfigMissing { .. }
            | AggregatorError::ConfigInvalid { .. }
            | AggregatorError::InvalidInput { .. }
            | AggregatorError::UnsupportedIndex { .. } => 2,
            AggregatorError::SourceUnavailable { .. }
            | AggregatorError::RateLimited { .. }
            | AggregatorError::MalformedData { .. } => 3,
            AggregatorError::NoData { .. } => 5,
            AggregatorError::Table { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
