//! HTTP error responses for web adapter.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::domain::error::AggregatorError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &AggregatorError) -> StatusCode {
    match err {
        AggregatorError::ConfigMissing { .. }
        | AggregatorError::ConfigInvalid { .. }
        | AggregatorError::ConfigParse { .. }
        | AggregatorError::InvalidInput { .. }
        | AggregatorError::UnsupportedIndex { .. } => StatusCode::BAD_REQUEST,
        AggregatorError::NoData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AggregatorError::SourceUnavailable { .. }
        | AggregatorError::RateLimited { .. }
        | AggregatorError::MalformedData { .. }
        | AggregatorError::Table { .. } => StatusCode::BAD_GATEWAY,
        AggregatorError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AggregatorError> for WebError {
    fn from(err: AggregatorError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let template = super::templates::ErrorTemplate {
            message: &self.message,
            status: self.status.as_u16(),
        };
        match template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, self.message).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_bad_request() {
        let err: WebError = AggregatorError::invalid_input("duplicate symbol AAPL").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("AAPL"));
    }

    #[test]
    fn upstream_errors_are_bad_gateway() {
        assert_eq!(
            status_from_error(&AggregatorError::RateLimited { symbol: "X".into() }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_from_error(&AggregatorError::Table { reason: "no table".into() }),
            StatusCode::BAD_GATEWAY
        );
    }
}
