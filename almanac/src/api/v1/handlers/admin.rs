//! v1 admin handlers.

use axum::extract::State;

use crate::api::extractors::AppJson;
use crate::api::v1::dto::{ResetInterpretationsRequest, ResetInterpretationsResponse, SweepResponse};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::AppState;
use crate::services::validate_owner;

/// `POST /api/v1/admin/interpretations:sweep`
#[utoipa::path(
    post,
    path = "/api/v1/admin/interpretations:sweep",
    tag = "admin",
    responses(
        (status = 200, description = "Expired entries removed", body = SweepResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn sweep_interpretations(State(state): State<AppState>) -> ApiResponse<SweepResponse> {
    match state.sweeper.run_once().await {
        Ok(deleted) => ApiResponse::success(SweepResponse { deleted }),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/admin/interpretations:reset`
#[utoipa::path(
    post,
    path = "/api/v1/admin/interpretations:reset",
    tag = "admin",
    request_body = ResetInterpretationsRequest,
    responses(
        (status = 200, description = "Entries removed", body = ResetInterpretationsResponse),
        (status = 404, description = "Cycle not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn reset_interpretations(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResetInterpretationsRequest>,
) -> ApiResponse<ResetInterpretationsResponse> {
    if let Err(e) = validate_owner(&req.owner) {
        return e.into();
    }

    let period = match req.cycle_label.as_deref() {
        Some(label) => match state.cycles.get_cycle(&req.owner, label).await {
            Ok(cycle) => Some(cycle.period()),
            Err(e) => return e.into(),
        },
        None => None,
    };

    match state.db.reset_interpretations(&req.owner, period).await {
        Ok(deleted) => {
            tracing::info!(
                owner = %req.owner,
                cycle = ?req.cycle_label,
                deleted,
                "Interpretations reset"
            );
            ApiResponse::success(ResetInterpretationsResponse { deleted })
        }
        Err(e) => e.into(),
    }
}
