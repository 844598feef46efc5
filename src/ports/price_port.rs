//! Market-data access port trait.

use crate::domain::error::AggregatorError;
use crate::domain::metadata::SymbolMetadata;
use crate::domain::price::PriceObservation;
use chrono::NaiveDate;

/// Price history and company metadata for a ticker.
///
/// Implementations return observations keyed by exchange-local calendar date.
/// An unknown symbol yields an empty history, not an error; transport and
/// parse failures map to [`AggregatorError::SourceUnavailable`] or
/// [`AggregatorError::RateLimited`].
pub trait PriceHistoryPort {
    /// Daily observations within `[start, end]`; `None` leaves that side open.
    fn get_history(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceObservation>, AggregatorError>;

    fn get_metadata(&self, symbol: &str) -> Result<SymbolMetadata, AggregatorError>;
}
