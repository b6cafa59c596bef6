use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Almanac API",
        version = "1.0.0",
        description = "Solar return cycles, cached event interpretations and iCalendar export.",
    ),
    paths(
        handlers::health::health_check,
        handlers::cycles::open_cycle,
        handlers::cycles::get_cycle,
        handlers::cycles::reconcile,
        handlers::cycles::export_calendar,
        handlers::cycles::list_interpretations,
        handlers::admin::sweep_interpretations,
        handlers::admin::reset_interpretations,
    ),
    components(schemas(
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        dto::BirthProfileDto,
        dto::OpenCycleRequest,
        dto::GenerationContextDto,
        dto::ReconcileRequestBody,
        dto::CycleEventResponse,
        dto::CycleResponse,
        dto::ReconcileResponse,
        dto::V1Origin,
        dto::EventInterpretationResponse,
        dto::SweepResponse,
        dto::ResetInterpretationsRequest,
        dto::ResetInterpretationsResponse,
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::LlmStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "cycles", description = "Solar cycles, interpretation generation and calendar export"),
        (name = "admin", description = "Cache maintenance (auth required)"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
