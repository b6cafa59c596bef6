//! # V1 response envelope
//!
//! ```json
//! { "data": { ... }, "meta": { "total": 3 } }
//! { "error": { "code": "not_found", "message": "Cycle 2025 for ada" } }
//! ```
//!
//! The calendar export is the one exception: on success it returns raw
//! `text/calendar` bytes, and only its errors use the envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AlmanacError;

/// Machine-readable error code, serialized as snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed body, invalid owner, birth data or cycle label.
    InvalidRequest,
    Unauthorized,
    NotFound,
    RateLimited,
    /// Internal details are never leaked.
    InternalError,
    /// The chart or generation provider failed.
    UpstreamError,
    Unavailable,
    UpstreamTimeout,
}

impl ErrorCode {
    fn wire(self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidRequest => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Self::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            Self::UpstreamError => (StatusCode::BAD_GATEWAY, "upstream_error"),
            Self::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            Self::UpstreamTimeout => (StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.wire().0
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire().1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Safe to show to end users.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::ok(data, None)
    }

    pub fn success_with_meta(data: T, meta: ResponseMeta) -> Self {
        Self::ok(data, Some(meta))
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            data: None,
            meta: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status: code.status(),
        }
    }

    fn ok(data: T, meta: Option<ResponseMeta>) -> Self {
        Self {
            data: Some(data),
            meta,
            error: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize v1 response");
                ApiResponse::<()>::error(ErrorCode::InternalError, INTERNAL_MESSAGE).into_response()
            }
        }
    }
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";
const UPSTREAM_MESSAGE: &str = "An upstream provider failed";

/// Code and user-facing message for an error. Upstream and internal details
/// stay in the logs.
fn classify(err: &AlmanacError) -> (ErrorCode, String) {
    match err {
        AlmanacError::NotFound(msg) => (ErrorCode::NotFound, msg.clone()),
        AlmanacError::Validation(msg) => (ErrorCode::InvalidRequest, msg.clone()),
        AlmanacError::Json(e) => (ErrorCode::InvalidRequest, format!("Invalid JSON: {e}")),
        AlmanacError::UrlParse(e) => (ErrorCode::InvalidRequest, format!("Invalid URL: {e}")),
        AlmanacError::ApiAuth(_) => (ErrorCode::Unauthorized, "Authentication required".to_string()),
        AlmanacError::LlmRateLimit { retry_after: Some(secs) } => (
            ErrorCode::RateLimited,
            format!("Rate limit exceeded, retry after {secs} seconds"),
        ),
        AlmanacError::LlmRateLimit { retry_after: None } => {
            (ErrorCode::RateLimited, "Rate limit exceeded".to_string())
        }
        AlmanacError::LlmUnavailable(msg) => (ErrorCode::Unavailable, msg.clone()),
        AlmanacError::ProviderTimeout(secs) => (
            ErrorCode::UpstreamTimeout,
            format!("Provider did not answer within {secs} seconds"),
        ),
        AlmanacError::ChartProvider(_)
        | AlmanacError::Llm(_)
        | AlmanacError::ProviderMalformedOutput(_)
        | AlmanacError::Http(_) => (ErrorCode::UpstreamError, UPSTREAM_MESSAGE.to_string()),
        AlmanacError::Database(_) | AlmanacError::Io(_) | AlmanacError::Internal(_) => {
            (ErrorCode::InternalError, INTERNAL_MESSAGE.to_string())
        }
    }
}

impl<T: Serialize> From<AlmanacError> for ApiResponse<T> {
    fn from(err: AlmanacError) -> Self {
        let (code, message) = classify(&err);
        match code {
            ErrorCode::InternalError => {
                tracing::error!(error = %err, "Internal error mapped to v1 response")
            }
            ErrorCode::UpstreamError => {
                tracing::warn!(error = %err, "Upstream error mapped to v1 response")
            }
            _ => {}
        }
        ApiResponse::error(code, message)
    }
}
