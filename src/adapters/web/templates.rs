//! HTML templates using Askama.

use askama::Template;
use axum::{
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};

use super::{is_htmx_request, WebError};

#[derive(Template)]
#[template(path = "base.html")]
pub struct BasePage<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate;

#[derive(Template)]
#[template(path = "select_index.html")]
pub struct SelectIndexTemplate<'a> {
    pub indices: &'a [&'a str],
}

#[derive(Template)]
#[template(path = "constituents.html")]
pub struct ConstituentsTemplate<'a> {
    pub index_name: &'a str,
    pub ticker_column: &'a str,
    pub total_rows: usize,
    pub shown_rows: usize,
    pub headers: &'a [String],
    pub rows: &'a [Vec<String>],
}

#[derive(Template)]
#[template(path = "lookup_form.html")]
pub struct LookupFormTemplate<'a> {
    pub default_start: &'a str,
    pub default_end: &'a str,
}

pub struct FailureRow {
    pub symbol: String,
    pub reason: String,
}

#[derive(Template)]
#[template(path = "metrics_table.html")]
pub struct MetricsTableTemplate<'a> {
    pub start_date: &'a str,
    pub end_date: &'a str,
    pub headers: &'a [String],
    pub rows: &'a [Vec<String>],
    pub failures: &'a [FailureRow],
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}

/// Renders `fragment` alone for HTMX requests, wrapped in the base page otherwise.
pub fn render_page<T: Template>(
    headers: &HeaderMap,
    title: &str,
    fragment: &T,
) -> Result<Response, WebError> {
    let content = fragment
        .render()
        .map_err(|e| WebError::internal(format!("template error: {}", e)))?;
    if is_htmx_request(headers) {
        return Ok(Html(content).into_response());
    }
    let page = BasePage {
        title,
        content: &content,
    }
    .render()
    .map_err(|e| WebError::internal(format!("template error: {}", e)))?;
    Ok(Html(page).into_response())
}
