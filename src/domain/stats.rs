//! Statistical helpers for the metrics engine.
//!
//! Functions return `None` where the statistic is undefined (too few points,
//! zero variance) rather than a sentinel number.

use chrono::NaiveDate;

/// Mean of the trailing `window` values ending at the last element.
pub fn trailing_sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Minimum of `(close - running_max) / running_max` over the series.
///
/// Always `<= 0`; `0` when the series never falls below a prior peak.
pub fn max_drawdown(closes: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for &close in closes {
        if close > peak {
            peak = close;
        }
        if peak > 0.0 {
            let dd = (close - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }

    worst
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Annualized Sharpe ratio of daily returns against a flat annual risk-free rate.
pub fn sharpe_ratio(
    daily_returns: &[f64],
    risk_free_rate_annual: f64,
    trading_days_per_year: f64,
) -> Option<f64> {
    let daily_rf = risk_free_rate_annual / trading_days_per_year;
    let excess: Vec<f64> = daily_returns.iter().map(|r| r - daily_rf).collect();

    let sd = sample_stddev(&excess)?;
    if !(sd > f64::EPSILON) {
        return None;
    }
    let m = mean(&excess)?;
    Some(m / sd * trading_days_per_year.sqrt())
}

/// Pearson correlation of paired observations.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    // Each side must vary on its own scale.
    let sd_x = (var_x / (n - 1.0)).sqrt();
    let sd_y = (var_y / (n - 1.0)).sqrt();
    if !(sd_x > f64::EPSILON && sd_y > f64::EPSILON) {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Whole years plus remainder months between two dates.
///
/// Approximate calendar arithmetic: a year is 365 days and a month is 30 days
/// of the remainder.
pub fn elapsed_range(from: NaiveDate, to: NaiveDate) -> String {
    let days = (to - from).num_days().max(0);
    let years = days / 365;
    let months = days % 365 / 30;
    if years > 0 {
        format!("{} years, {} months", years, months)
    } else {
        format!("{} months", months)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn sma_undefined_when_short() {
        assert_eq!(trailing_sma(&[1.0, 2.0], 3), None);
        assert_eq!(trailing_sma(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn sma_uses_trailing_window() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(trailing_sma(&values, 2).unwrap(), 4.5);
        assert_relative_eq!(trailing_sma(&values, 5).unwrap(), 3.0);
    }

    #[test]
    fn drawdown_monotonic_rise_is_zero() {
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn drawdown_peak_to_trough() {
        let dd = max_drawdown(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert_relative_eq!(dd, (80.0 - 110.0) / 110.0);
    }

    #[test]
    fn sharpe_undefined_for_constant_returns() {
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01], 0.02, 252.0), None);
        assert_eq!(sharpe_ratio(&[0.01], 0.02, 252.0), None);
    }

    #[test]
    fn sharpe_matches_formula() {
        let returns = [0.01, -0.005, 0.02, 0.0, 0.003];
        let rf = 0.02 / 252.0;
        let excess: Vec<f64> = returns.iter().map(|r| r - rf).collect();
        let m = excess.iter().sum::<f64>() / 5.0;
        let var = excess.iter().map(|e| (e - m).powi(2)).sum::<f64>() / 4.0;
        let expected = m / var.sqrt() * 252f64.sqrt();
        assert_relative_eq!(
            sharpe_ratio(&returns, 0.02, 252.0).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn pearson_identical_series() {
        let pairs = [(0.01, 0.01), (-0.02, -0.02), (0.03, 0.03)];
        assert_relative_eq!(pearson(&pairs).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn pearson_zero_variance_is_undefined() {
        let pairs = [(0.01, 0.01), (0.01, 0.01), (0.01, 0.01)];
        assert_eq!(pearson(&pairs), None);
        let pairs = [(0.01, 0.02), (0.02, 0.02), (0.03, 0.02)];
        assert_eq!(pearson(&pairs), None);
    }

    #[test]
    fn pearson_constant_growth_is_undefined() {
        let closes = [100.0, 101.0, 102.01, 103.0301, 104.060401];
        let returns: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
        let market = [0.01, -0.02, 0.015, -0.005];
        let pairs: Vec<(f64, f64)> = returns.iter().copied().zip(market).collect();

        assert_eq!(pearson(&pairs), None);
        assert_eq!(sharpe_ratio(&returns, 0.02, 252.0), None);
        let swapped: Vec<(f64, f64)> = pairs.iter().map(|&(x, y)| (y, x)).collect();
        assert_eq!(pearson(&swapped), None);
    }

    #[test]
    fn pearson_small_but_real_variation() {
        let pairs = [(1e-6, 2e-6), (-1e-6, -2e-6), (3e-6, 6e-6)];
        assert_relative_eq!(pearson(&pairs).unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn pearson_needs_two_points() {
        assert_eq!(pearson(&[(0.1, 0.2)]), None);
        assert_eq!(pearson(&[]), None);
    }

    #[test]
    fn pearson_anti_correlated() {
        let pairs = [(1.0, -1.0), (2.0, -2.0), (3.0, -3.0)];
        assert_relative_eq!(pearson(&pairs).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn elapsed_range_years_and_months() {
        assert_eq!(
            elapsed_range(d(2010, 3, 1), d(2024, 12, 31)),
            "14 years, 10 months"
        );
    }

    #[test]
    fn elapsed_range_under_a_year() {
        assert_eq!(elapsed_range(d(2024, 1, 1), d(2024, 3, 15)), "2 months");
        assert_eq!(elapsed_range(d(2024, 1, 1), d(2024, 1, 1)), "0 months");
    }

    proptest! {
        #[test]
        fn drawdown_never_positive(closes in prop::collection::vec(0.01f64..1000.0, 1..200)) {
            let dd = max_drawdown(&closes);
            prop_assert!(dd <= 0.0);
            prop_assert!(dd > -1.0);
        }

        #[test]
        fn drawdown_zero_iff_never_below_peak(closes in prop::collection::vec(0.01f64..1000.0, 1..100)) {
            let mut peak = f64::NEG_INFINITY;
            let mut fell = false;
            for &c in &closes {
                if c < peak { fell = true; }
                peak = peak.max(c);
            }
            prop_assert_eq!(max_drawdown(&closes) == 0.0, !fell);
        }

        #[test]
        fn correlation_bounded(pairs in prop::collection::vec((-0.2f64..0.2, -0.2f64..0.2), 2..120)) {
            if let Some(c) = pearson(&pairs) {
                prop_assert!((-1.0..=1.0).contains(&c));
            }
        }

        #[test]
        fn sma_is_trailing_mean(values in prop::collection::vec(1.0f64..500.0, 0..300), window in 1usize..250) {
            match trailing_sma(&values, window) {
                None => prop_assert!(values.len() < window),
                Some(v) => {
                    let tail = &values[values.len() - window..];
                    let expected = tail.iter().sum::<f64>() / window as f64;
                    prop_assert!((v - expected).abs() < 1e-9);
                }
            }
        }
    }
}
