//! Descriptive fields fetched alongside price history.

/// Placeholder shown for an unknown sector or industry.
pub const NOT_AVAILABLE: &str = "N/A";

/// Company metadata. Every field is optional; a missing field never fails the
/// symbol, it is rendered as [`NOT_AVAILABLE`] or left unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolMetadata {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub dividend_yield: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub beta: Option<f64>,
}

impl SymbolMetadata {
    /// `"{sector} / {industry}"`, each part falling back to `N/A`.
    pub fn sector_industry(&self) -> String {
        format!(
            "{} / {}",
            non_blank(self.sector.as_deref()).unwrap_or(NOT_AVAILABLE),
            non_blank(self.industry.as_deref()).unwrap_or(NOT_AVAILABLE)
        )
    }

    pub fn pays_dividend(&self) -> bool {
        self.dividend_yield.is_some_and(|y| y > 0.0)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
