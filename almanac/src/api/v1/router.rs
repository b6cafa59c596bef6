use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;
use super::middleware::v1_auth_middleware;

pub fn v1_router(state: AppState) -> Router<AppState> {
    let cycles = Router::new()
        .route("/", post(handlers::cycles::open_cycle))
        .route("/{owner}/{label}", get(handlers::cycles::get_cycle))
        .route(
            "/{owner}/{label}/reconcile",
            post(handlers::cycles::reconcile),
        )
        .route(
            "/{owner}/{label}/calendar.ics",
            get(handlers::cycles::export_calendar),
        )
        .route(
            "/{owner}/{label}/interpretations",
            get(handlers::cycles::list_interpretations),
        );

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    let protected_routes = Router::new()
        .nest("/cycles", cycles)
        .route(
            "/admin/interpretations:sweep",
            post(handlers::admin::sweep_interpretations),
        )
        .route(
            "/admin/interpretations:reset",
            post(handlers::admin::reset_interpretations),
        )
        .route_layer(middleware::from_fn_with_state(state, v1_auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
