//! Bearer API-key authentication for protected v1 routes.
//!
//! Tokens are checked against `ALMANAC_API_KEYS`. Failures are answered with
//! the v1 JSON envelope, not a bare status code.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::state::AppState;

use super::response::{ApiResponse, ErrorCode};

/// With no keys configured the server still starts, but every protected
/// route answers 401.
pub async fn v1_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let keys = &state.config.server.api_keys;
    if keys.is_empty() {
        return ApiResponse::<()>::error(
            ErrorCode::Unauthorized,
            "API keys not configured. Set ALMANAC_API_KEYS to enable access.",
        )
        .into_response();
    }

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match header.map(|h| h.strip_prefix("Bearer ")) {
        Some(Some(token)) => token,
        Some(None) => {
            return ApiResponse::<()>::error(
                ErrorCode::Unauthorized,
                "Invalid authorization header format. Expected: Bearer <token>",
            )
            .into_response();
        }
        None => {
            return ApiResponse::<()>::error(ErrorCode::Unauthorized, "Missing authorization header")
                .into_response();
        }
    };

    if keys.iter().any(|key| key == token) {
        next.run(request).await
    } else {
        tracing::debug!("Rejected request with unknown API key");
        ApiResponse::<()>::error(ErrorCode::Unauthorized, "Invalid API key").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::test_app;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn build_test_app(api_keys: Vec<String>) -> Router {
        let state = test_app(api_keys).await.state;

        async fn protected_handler() -> &'static str {
            "protected"
        }

        Router::new()
            .route("/protected", get(protected_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), v1_auth_middleware))
            .with_state(state)
    }

    async fn parse_error_body(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/protected");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_when_no_keys_configured() {
        let app = build_test_app(vec![]).await;

        let response = app.oneshot(request(Some("Bearer anything"))).await.unwrap();

        let (status, json) = parse_error_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "unauthorized");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("ALMANAC_API_KEYS"));
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_allows_valid_key() {
        let app = build_test_app(vec!["k1".to_string(), "k2".to_string()]).await;

        let response = app.oneshot(request(Some("Bearer k2"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejects_invalid_key() {
        let app = build_test_app(vec!["k1".to_string()]).await;

        let response = app.oneshot(request(Some("Bearer wrong"))).await.unwrap();

        let (status, json) = parse_error_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "Invalid API key");
    }

    #[tokio::test]
    async fn test_rejects_non_bearer_scheme() {
        let app = build_test_app(vec!["k1".to_string()]).await;

        let response = app.oneshot(request(Some("Basic azE="))).await.unwrap();

        let (status, json) = parse_error_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Expected: Bearer"));
    }

    #[tokio::test]
    async fn test_rejects_missing_header() {
        let app = build_test_app(vec!["k1".to_string()]).await;

        let response = app.oneshot(request(None)).await.unwrap();

        let (_, json) = parse_error_body(response).await;
        assert_eq!(json["error"]["message"], "Missing authorization header");
    }
}
