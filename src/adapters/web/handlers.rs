//! HTTP request handlers for web adapter.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::domain::batch::{BatchRequest, BatchRunner, CancelFlag};
use crate::domain::index_catalog::{find_index, INDICES};
use crate::domain::settings::parse_date;
use crate::domain::symbols::{fetch_constituents, parse_symbols, ticker_column};
use crate::domain::table::Table;

use super::templates::{
    render_page, ConstituentsTemplate, ErrorTemplate, FailureRow, HomeTemplate,
    LookupFormTemplate, MetricsTableTemplate, SelectIndexTemplate,
};
use super::{AppState, WebError};

/// Rows shown in the scraped-table preview.
const PREVIEW_ROWS: usize = 100;

pub async fn home(headers: HeaderMap) -> Result<Response, WebError> {
    render_page(&headers, "Home", &HomeTemplate)
}

pub async fn select_index(headers: HeaderMap) -> Result<Response, WebError> {
    let names: Vec<&str> = INDICES.iter().map(|i| i.name).collect();
    render_page(&headers, "Select index", &SelectIndexTemplate { indices: &names })
}

#[derive(Debug, serde::Deserialize)]
pub struct ScrapeFormData {
    pub index: String,
}

pub async fn scrape(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ScrapeFormData>,
) -> Result<Response, WebError> {
    let index = find_index(&form.index)?;
    let source = Arc::clone(&state.constituents);

    let table = tokio::task::spawn_blocking(move || fetch_constituents(source.as_ref(), index))
        .await
        .map_err(|e| WebError::internal(format!("scrape task failed: {}", e)))??;

    let preview = table.head(PREVIEW_ROWS);
    let template = ConstituentsTemplate {
        index_name: index.name,
        ticker_column: ticker_column(&table).unwrap_or_default(),
        total_rows: table.row_count(),
        shown_rows: preview.row_count(),
        headers: &preview.headers,
        rows: &preview.rows,
    };
    render_page(&headers, index.name, &template)
}

pub async fn lookup_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let start = state.settings.batch.start_date.to_string();
    let end = state.settings.batch.end_date.to_string();
    let template = LookupFormTemplate {
        default_start: &start,
        default_end: &end,
    };
    render_page(&headers, "Look up symbols", &template)
}

#[derive(Debug, serde::Deserialize)]
pub struct LookupFormData {
    pub symbols: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

fn form_date(raw: &str, default: NaiveDate, field: &str) -> Result<NaiveDate, WebError> {
    if raw.trim().is_empty() {
        return Ok(default);
    }
    parse_date(raw).ok_or_else(|| WebError::bad_request(format!("Invalid {} format", field)))
}

pub async fn lookup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LookupFormData>,
) -> Result<Response, WebError> {
    let symbols = parse_symbols(&form.symbols).map_err(|e| WebError::bad_request(e.to_string()))?;
    let defaults = &state.settings.batch;
    let request = BatchRequest {
        symbols,
        start: form_date(&form.start_date, defaults.start_date, "start date")?,
        end: form_date(&form.end_date, defaults.end_date, "end date")?,
        benchmark: defaults.benchmark.clone(),
    };
    request.validate()?;

    let worker_state = Arc::clone(&state);
    let worker_request = request.clone();
    let result = tokio::task::spawn_blocking(move || {
        let settings = &worker_state.settings;
        let runner = BatchRunner {
            source: worker_state.price_source.as_ref(),
            pacer: worker_state.pacer.as_ref(),
            metrics: &settings.metrics,
            pacing: &settings.pacing,
        };
        runner.run(&worker_request, &CancelFlag::new(), &mut |event| {
            tracing::debug!(?event, "lookup progress");
        })
    })
    .await
    .map_err(|e| WebError::internal(format!("lookup task failed: {}", e)))??;

    let table = Table::from_batch(&result, &state.settings.metrics.sma_windows);
    let failures: Vec<FailureRow> = result
        .failures()
        .map(|(symbol, reason)| FailureRow {
            symbol: symbol.to_string(),
            reason: reason.describe(),
        })
        .collect();

    let start = request.start.to_string();
    let end = request.end.to_string();
    let template = MetricsTableTemplate {
        start_date: &start,
        end_date: &end,
        headers: &table.headers,
        rows: &table.rows,
        failures: &failures,
    };
    render_page(&headers, "Metrics", &template)
}

pub async fn not_found(headers: HeaderMap) -> Response {
    let template = ErrorTemplate {
        message: "Page not found",
        status: 404,
    };
    match render_page(&headers, "Not found", &template) {
        Ok(response) => (StatusCode::NOT_FOUND, response).into_response(),
        Err(e) => e.into_response(),
    }
}
