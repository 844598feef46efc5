//! Web server adapter.
//!
//! Axum server with an HTMX front end: index scraping and symbol lookups from
//! a browser. Source calls block, so handlers run them on the blocking pool.

mod error;
mod handlers;
mod templates;

pub use error::WebError;
pub use handlers::*;
pub use templates::*;

use axum::{
    Router,
    routing::get,
};
use std::sync::Arc;

use crate::domain::settings::Settings;
use crate::ports::constituent_port::ConstituentPort;
use crate::ports::pacer_port::Pacer;
use crate::ports::price_port::PriceHistoryPort;

pub struct AppState {
    pub price_source: Arc<dyn PriceHistoryPort + Send + Sync>,
    pub constituents: Arc<dyn ConstituentPort + Send + Sync>,
    pub pacer: Arc<dyn Pacer + Send + Sync>,
    pub settings: Arc<Settings>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/select-index", get(handlers::select_index))
        .route("/scrape", axum::routing::post(handlers::scrape))
        .route("/lookup", get(handlers::lookup_form).post(handlers::lookup))
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
}

fn is_htmx_request(headers: &axum::http::HeaderMap) -> bool {
    headers.get("HX-Request").is_some()
}
