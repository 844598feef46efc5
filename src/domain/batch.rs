//! Batch orchestrator.
//!
//! Processes symbols sequentially against one shared benchmark series.
//! Per-symbol failures are recorded and never abort the batch; only invalid
//! input is fatal. Pacing and retry backoff go through the [`Pacer`] port.

use crate::domain::error::AggregatorError;
use crate::domain::metrics::SymbolMetrics;
use crate::domain::pipeline::{benchmark_returns, compute_metrics};
use crate::domain::price::ReturnSeries;
use crate::domain::settings::{validate_range, MetricsConfig, PacingConfig};
use crate::ports::pacer_port::Pacer;
use crate::ports::price_port::PriceHistoryPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    NoData,
    SourceUnavailable(String),
    RateLimited,
}

impl FailureReason {
    pub fn describe(&self) -> String {
        match self {
            FailureReason::NoData => "no data".to_string(),
            FailureReason::SourceUnavailable(reason) => format!("source unavailable: {}", reason),
            FailureReason::RateLimited => "rate limited".to_string(),
        }
    }
}

impl From<AggregatorError> for FailureReason {
    fn from(err: AggregatorError) -> Self {
        match err {
            AggregatorError::NoData { .. } => FailureReason::NoData,
            AggregatorError::RateLimited { .. } => FailureReason::RateLimited,
            AggregatorError::SourceUnavailable { reason, .. }
            | AggregatorError::MalformedData { reason, .. } => FailureReason::SourceUnavailable(reason),
            other => FailureReason::SourceUnavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Computed(SymbolMetrics),
    Failed(FailureReason),
}

/// Outcome per symbol, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    entries: Vec<(String, SymbolOutcome)>,
    cancelled: bool,
}

impl BatchResult {
    pub fn from_entries(entries: Vec<(String, SymbolOutcome)>) -> Self {
        Self {
            entries,
            cancelled: false,
        }
    }

    pub fn entries(&self) -> &[(String, SymbolOutcome)] {
        &self.entries
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, outcome)| outcome)
    }

    pub fn metrics(&self, symbol: &str) -> Option<&SymbolMetrics> {
        match self.get(symbol) {
            Some(SymbolOutcome::Computed(m)) => Some(m),
            _ => None,
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = &SymbolMetrics> {
        self.entries.iter().filter_map(|(_, outcome)| match outcome {
            SymbolOutcome::Computed(m) => Some(m),
            SymbolOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &FailureReason)> {
        self.entries.iter().filter_map(|(s, outcome)| match outcome {
            SymbolOutcome::Failed(reason) => Some((s.as_str(), reason)),
            SymbolOutcome::Computed(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    /// True when the batch stopped early on request.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub benchmark: String,
}

impl BatchRequest {
    pub fn validate(&self) -> Result<(), AggregatorError> {
        if self.symbols.is_empty() {
            return Err(AggregatorError::invalid_input("symbol list is empty"));
        }
        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if symbol.trim().is_empty() {
                return Err(AggregatorError::invalid_input("blank symbol in list"));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(AggregatorError::invalid_input(format!(
                    "duplicate symbol {}",
                    symbol
                )));
            }
        }
        validate_range(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchProgress {
    Started {
        total: usize,
    },
    Symbol {
        /// 1-based position in the batch.
        position: usize,
        total: usize,
        symbol: String,
        outcome: Result<(), FailureReason>,
    },
    Finished {
        succeeded: usize,
        failed: usize,
        cancelled: bool,
    },
}

/// Cooperative cancellation, checked between symbols.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BatchRunner<'a> {
    pub source: &'a dyn PriceHistoryPort,
    pub pacer: &'a dyn Pacer,
    pub metrics: &'a MetricsConfig,
    pub pacing: &'a PacingConfig,
}

impl BatchRunner<'_> {
    pub fn run(
        &self,
        request: &BatchRequest,
        cancel: &CancelFlag,
        progress: &mut dyn FnMut(BatchProgress),
    ) -> Result<BatchResult, AggregatorError> {
        request.validate()?;
        let total = request.symbols.len();
        progress(BatchProgress::Started { total });

        let benchmark = match benchmark_returns(
            self.source,
            &request.benchmark,
            request.start,
            request.end,
        ) {
            Ok(returns) => {
                tracing::info!(
                    benchmark = %request.benchmark,
                    returns = returns.len(),
                    "loaded benchmark returns"
                );
                returns
            }
            Err(e) => {
                tracing::warn!(
                    benchmark = %request.benchmark,
                    "benchmark unavailable, correlations will be empty: {e}"
                );
                ReturnSeries::default()
            }
        };
        self.pacer.wait();

        let mut result = BatchResult::default();

        for (i, symbol) in request.symbols.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(processed = i, total, "batch cancelled");
                result.cancelled = true;
                break;
            }

            tracing::info!("Fetching data for {symbol} ({}/{total})", i + 1);
            let outcome = self.compute_with_retry(symbol, request, &benchmark, cancel);

            let reported = match &outcome {
                SymbolOutcome::Computed(_) => Ok(()),
                SymbolOutcome::Failed(reason) => {
                    tracing::warn!("skipping {symbol} ({})", reason.describe());
                    Err(reason.clone())
                }
            };
            result.entries.push((symbol.clone(), outcome));
            progress(BatchProgress::Symbol {
                position: i + 1,
                total,
                symbol: symbol.clone(),
                outcome: reported,
            });

            if i + 1 < total {
                self.pacer.wait();
            }
        }

        let succeeded = result.success_count();
        progress(BatchProgress::Finished {
            succeeded,
            failed: result.len() - succeeded,
            cancelled: result.cancelled,
        });
        Ok(result)
    }

    fn compute_with_retry(
        &self,
        symbol: &str,
        request: &BatchRequest,
        benchmark: &ReturnSeries,
        cancel: &CancelFlag,
    ) -> SymbolOutcome {
        let mut attempt = 0;
        loop {
            match compute_metrics(
                self.source,
                symbol,
                request.start,
                request.end,
                benchmark,
                self.metrics,
            ) {
                Ok(metrics) => return SymbolOutcome::Computed(metrics),
                Err(e)
                    if e.is_retryable()
                        && attempt < self.pacing.max_retries
                        && !cancel.is_cancelled() =>
                {
                    attempt += 1;
                    let delay = self.pacing.backoff_for(attempt);
                    tracing::warn!(
                        symbol,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after error: {e}"
                    );
                    self.pacer.backoff(delay);
                }
                Err(e) => return SymbolOutcome::Failed(e.into()),
            }
        }
    }
}

/// A batch running on a background thread.
pub struct BatchHandle {
    pub progress: Receiver<BatchProgress>,
    cancel: CancelFlag,
    worker: JoinHandle<Result<BatchResult, AggregatorError>>,
}

impl BatchHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn join(self) -> Result<BatchResult, AggregatorError> {
        self.worker.join().map_err(|_| {
            AggregatorError::Io(std::io::Error::other("batch worker panicked"))
        })?
    }
}

/// Runs the batch on its own thread; progress is delivered over a channel so
/// the caller never blocks the loop.
pub fn spawn_batch(
    source: Arc<dyn PriceHistoryPort + Send + Sync>,
    pacer: Arc<dyn Pacer + Send + Sync>,
    metrics: MetricsConfig,
    pacing: PacingConfig,
    request: BatchRequest,
) -> BatchHandle {
    let (tx, rx) = mpsc::channel();
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();

    let worker = std::thread::spawn(move || {
        let runner = BatchRunner {
            source: source.as_ref(),
            pacer: pacer.as_ref(),
            metrics: &metrics,
            pacing: &pacing,
        };
        // A dropped receiver only means nobody is watching.
        runner.run(&request, &worker_cancel, &mut |event| {
            let _ = tx.send(event);
        })
    });

    BatchHandle {
        progress: rx,
        cancel,
        worker,
    }
}
