//! v1 cycle handlers.

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use crate::api::extractors::AppJson;
use crate::api::v1::dto::{
    CycleResponse, EventInterpretationResponse, OpenCycleRequest, ReconcileRequestBody,
    ReconcileResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse, ResponseMeta};
use crate::api::AppState;
use crate::models::BirthProfile;
use crate::services::ReconcileRequest;

/// `POST /api/v1/cycles`
///
/// Create-or-get: a second call for the same owner and period returns the
/// stored cycle without asking the chart provider again.
#[utoipa::path(
    post,
    path = "/api/v1/cycles",
    tag = "cycles",
    operation_id = "cycles.open",
    request_body = OpenCycleRequest,
    responses(
        (status = 200, description = "Cycle for the period containing the reference date", body = CycleResponse),
        (status = 400, description = "Invalid owner or birth data", body = ApiError),
        (status = 502, description = "Chart provider failed", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn open_cycle(
    State(state): State<AppState>,
    AppJson(req): AppJson<OpenCycleRequest>,
) -> ApiResponse<CycleResponse> {
    let profile: BirthProfile = req.birth_profile.into();
    match state
        .cycles
        .open_cycle(&req.owner, &profile, req.reference_date)
        .await
    {
        Ok(cycle) => ApiResponse::success(cycle.into()),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/cycles/{owner}/{label}`
#[utoipa::path(
    get,
    path = "/api/v1/cycles/{owner}/{label}",
    tag = "cycles",
    operation_id = "cycles.get",
    params(
        ("owner" = String, Path, description = "Owner identifier"),
        ("label" = String, Path, description = "Cycle label, the start year"),
    ),
    responses(
        (status = 200, description = "Cycle found", body = CycleResponse),
        (status = 404, description = "Cycle not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_cycle(
    State(state): State<AppState>,
    Path((owner, label)): Path<(String, String)>,
) -> ApiResponse<CycleResponse> {
    match state.cycles.get_cycle(&owner, &label).await {
        Ok(cycle) => ApiResponse::success(cycle.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/cycles/{owner}/{label}/reconcile`
///
/// Generates whatever is missing. Provider failures are absorbed and counted
/// under `fallback`.
#[utoipa::path(
    post,
    path = "/api/v1/cycles/{owner}/{label}/reconcile",
    tag = "cycles",
    operation_id = "cycles.reconcile",
    params(
        ("owner" = String, Path, description = "Owner identifier"),
        ("label" = String, Path, description = "Cycle label"),
    ),
    request_body = ReconcileRequestBody,
    responses(
        (status = 200, description = "Reconcile report", body = ReconcileResponse),
        (status = 404, description = "Cycle not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn reconcile(
    State(state): State<AppState>,
    Path((owner, label)): Path<(String, String)>,
    AppJson(body): AppJson<ReconcileRequestBody>,
) -> ApiResponse<ReconcileResponse> {
    let request = ReconcileRequest {
        owner,
        cycle_label: label,
        context: body.context.unwrap_or_default().into(),
    };

    match state.orchestrator.reconcile(request).await {
        Ok(report) => ApiResponse::success(report.into()),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/cycles/{owner}/{label}/calendar.ics`
#[utoipa::path(
    get,
    path = "/api/v1/cycles/{owner}/{label}/calendar.ics",
    tag = "cycles",
    operation_id = "cycles.calendar",
    params(
        ("owner" = String, Path, description = "Owner identifier"),
        ("label" = String, Path, description = "Cycle label"),
    ),
    responses(
        (status = 200, description = "iCalendar document", content_type = "text/calendar", body = String),
        (status = 404, description = "Cycle not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn export_calendar(
    State(state): State<AppState>,
    Path((owner, label)): Path<(String, String)>,
) -> Response {
    match state.exporter.export(&owner, &label).await {
        Ok(document) => (
            [
                (CONTENT_TYPE, document.content_type.to_string()),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", document.filename),
                ),
            ],
            document.bytes,
        )
            .into_response(),
        Err(e) => ApiResponse::<()>::from(e).into_response(),
    }
}

/// `GET /api/v1/cycles/{owner}/{label}/interpretations`
#[utoipa::path(
    get,
    path = "/api/v1/cycles/{owner}/{label}/interpretations",
    tag = "cycles",
    operation_id = "cycles.interpretations",
    params(
        ("owner" = String, Path, description = "Owner identifier"),
        ("label" = String, Path, description = "Cycle label"),
    ),
    responses(
        (status = 200, description = "Events with their cached interpretations", body = Vec<EventInterpretationResponse>),
        (status = 404, description = "Cycle not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_interpretations(
    State(state): State<AppState>,
    Path((owner, label)): Path<(String, String)>,
) -> ApiResponse<Vec<EventInterpretationResponse>> {
    match state.cycles.interpretations(&owner, &label).await {
        Ok(views) => {
            let total = views.len() as u64;
            ApiResponse::success_with_meta(
                views.into_iter().map(Into::into).collect(),
                ResponseMeta { total: Some(total) },
            )
        }
        Err(e) => e.into(),
    }
}
