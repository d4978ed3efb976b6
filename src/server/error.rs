//! Error responses for the thinking routes
//!
//! Every failure leaves the server as `{ok: false, error: {code, message, detail?}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::{codes, ErrorInfo};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed local validation; no engine was started
    #[error("{0}")]
    InvalidInput(String),

    /// Unexpected failure inside the handler
    #[error("{0}")]
    Server(String),

    /// Failure envelope produced by the engine path
    #[error("{}", .0.message)]
    Engine(ErrorInfo),
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::InvalidInput(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Engine(info) => engine_status(info),
        }
    }

    pub fn into_info(self) -> ErrorInfo {
        match self {
            ApiError::InvalidInput(message) => ErrorInfo::new(codes::INVALID_INPUT, message),
            ApiError::Server(message) => ErrorInfo::new(codes::SERVER_ERROR, message),
            ApiError::Engine(info) => info,
        }
    }
}

/// Status for an engine failure: the engine's own hint when valid, else by code
fn engine_status(info: &ErrorInfo) -> StatusCode {
    if let Some(status) = info
        .engine_http_hint()
        .and_then(|hint| StatusCode::from_u16(hint).ok())
    {
        return status;
    }
    match info.code.as_str() {
        codes::ENGINE_TIMEOUT => StatusCode::GATEWAY_TIMEOUT,
        codes::ENGINE_BUSY => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.into_info();
        if status.is_server_error() {
            log::warn!("Request failed with {}: {} ({})", status, error.code, error.message);
        } else {
            log::debug!("Request rejected with {}: {}", status, error.code);
        }
        (status, Json(json!({ "ok": false, "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_errors() {
        assert_eq!(ApiError::invalid_input("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Server("boom".to_string()).into_info().code,
            codes::SERVER_ERROR
        );
    }

    #[test]
    fn test_engine_hint_wins() {
        let info = ErrorInfo::new("RATE_LIMIT", "slow down")
            .with_detail(json!({"engine": {"error": {"http_hint": 429}}}));
        assert_eq!(
            ApiError::Engine(info).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_engine_defaults_by_code() {
        let status = |code: &str| ApiError::Engine(ErrorInfo::new(code, "m")).status();
        assert_eq!(status(codes::BAD_JSON_FROM_ENGINE), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(codes::ENGINE_ERROR), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(codes::ENGINE_TIMEOUT), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status(codes::ENGINE_BUSY), StatusCode::SERVICE_UNAVAILABLE);
    }
}
