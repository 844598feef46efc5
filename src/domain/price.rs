//! Price observations, per-symbol histories and daily return series.

use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
}

impl PriceObservation {
    pub fn new(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }
}

/// Time-ordered observations for one symbol, one per trading day.
///
/// Construction sorts by date, keeps the last observation for a repeated date
/// and drops rows whose close is not a positive finite number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceHistory {
    observations: Vec<PriceObservation>,
}

impl PriceHistory {
    pub fn new(observations: Vec<PriceObservation>) -> Self {
        let by_date: BTreeMap<NaiveDate, PriceObservation> = observations
            .into_iter()
            .filter(|o| o.close.is_finite() && o.close > 0.0)
            .map(|o| (o.date, o))
            .collect();
        Self {
            observations: by_date.into_values().collect(),
        }
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.close).collect()
    }

    /// Observations with `start <= date <= end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> PriceHistory {
        PriceHistory {
            observations: self
                .observations
                .iter()
                .filter(|o| o.date >= start && o.date <= end)
                .copied()
                .collect(),
        }
    }

    pub fn daily_returns(&self) -> ReturnSeries {
        let points = self
            .observations
            .windows(2)
            .map(|w| ReturnPoint {
                date: w[1].date,
                value: (w[1].close - w[0].close) / w[0].close,
            })
            .collect();
        ReturnSeries { points }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Adjacent-close fractional returns. The first date of the source history
/// has no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Pairs of (self, other) returns on dates present in both series.
    pub fn aligned_with(&self, other: &ReturnSeries) -> Vec<(f64, f64)> {
        let theirs: BTreeMap<NaiveDate, f64> =
            other.points.iter().map(|p| (p.date, p.value)).collect();
        self.points
            .iter()
            .filter_map(|p| theirs.get(&p.date).map(|&m| (p.value, m)))
            .collect()
    }
}
