//! In-memory tabular data: uploaded symbol sheets, scraped constituent lists
//! and merged metric output.

use crate::domain::batch::BatchResult;
use crate::domain::error::AggregatorError;
use crate::domain::metrics::metric_columns;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table, padding or truncating each row to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Exact header match first, then case-insensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .or_else(|| {
                self.headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(name))
            })
    }

    pub fn require_column(&self, name: &str) -> Result<usize, AggregatorError> {
        self.column_index(name).ok_or_else(|| AggregatorError::Table {
            reason: format!("column '{}' not found", name),
        })
    }

    /// Unique non-empty values of `column`, in first-seen order.
    pub fn unique_values(&self, column: &str) -> Result<Vec<String>, AggregatorError> {
        let idx = self.require_column(column)?;
        let mut seen = std::collections::HashSet::new();
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(idx))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && seen.insert(v.clone()))
            .collect())
    }

    pub fn map_column<F>(&mut self, column: usize, f: F)
    where
        F: Fn(&str) -> String,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                if !cell.trim().is_empty() {
                    *cell = f(cell);
                }
            }
        }
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Table holding only the successful metrics of a batch, one row each.
    pub fn from_batch(result: &BatchResult, sma_windows: &[usize]) -> Table {
        let rows = result
            .successes()
            .map(|m| m.fields().into_iter().map(|(_, v)| v).collect())
            .collect();
        Table::new(metric_columns(sma_windows), rows)
    }

    /// Left join of batch metrics onto this table by `key_column`.
    ///
    /// Every original row is kept in order. Metric columns (except the
    /// duplicated key) are appended; rows whose symbol has no metrics get
    /// empty cells. A metric column whose name already exists is suffixed
    /// with `_y`.
    pub fn merge_metrics(
        &self,
        key_column: &str,
        result: &BatchResult,
        sma_windows: &[usize],
    ) -> Result<Table, AggregatorError> {
        let key_idx = self.require_column(key_column)?;
        let metric_table = Table::from_batch(result, sma_windows);

        let by_symbol: HashMap<&str, &Vec<String>> = metric_table
            .rows
            .iter()
            .map(|row| (row[0].as_str(), row))
            .collect();

        let mut headers = self.headers.clone();
        for name in metric_table.headers.iter().skip(1) {
            if headers.iter().any(|h| h == name) {
                headers.push(format!("{}_y", name));
            } else {
                headers.push(name.clone());
            }
        }

        let extra = metric_table.headers.len() - 1;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut merged = row.clone();
                let key = row.get(key_idx).map(|k| k.trim()).unwrap_or_default();
                match by_symbol.get(key) {
                    Some(metrics) => merged.extend(metrics.iter().skip(1).cloned()),
                    None => merged.extend(std::iter::repeat_n(String::new(), extra)),
                }
                merged
            })
            .collect();

        Ok(Table::new(headers, rows))
    }
}
