use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlmanacError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("API authentication error: {0}")]
    ApiAuth(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Chart provider error: {0}")]
    ChartProvider(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },

    #[error("Generation provider timed out after {0} seconds")]
    ProviderTimeout(u64),

    #[error("Generation provider returned malformed output: {0}")]
    ProviderMalformedOutput(String),
}

impl AlmanacError {
    /// Provider-side failures are absorbed by fallback synthesis instead of
    /// being reported to the caller.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            AlmanacError::Llm(_)
                | AlmanacError::LlmUnavailable(_)
                | AlmanacError::LlmRateLimit { .. }
                | AlmanacError::ProviderTimeout(_)
                | AlmanacError::ProviderMalformedOutput(_)
                | AlmanacError::Http(_)
        )
    }
}

impl From<validator::ValidationErrors> for AlmanacError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AlmanacError::Validation(errors.to_string())
    }
}

impl IntoResponse for AlmanacError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AlmanacError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AlmanacError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AlmanacError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AlmanacError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            AlmanacError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AlmanacError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AlmanacError::UrlParse(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AlmanacError::ApiAuth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AlmanacError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AlmanacError::ChartProvider(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AlmanacError::Llm(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AlmanacError::LlmUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AlmanacError::LlmRateLimit { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("LLM rate limit exceeded, retry after {retry_after:?} seconds"),
            ),
            AlmanacError::ProviderTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AlmanacError::ProviderMalformedOutput(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AlmanacError>;
