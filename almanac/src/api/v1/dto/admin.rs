//! Admin DTOs for the v1 API.

use serde::{Deserialize, Serialize};

/// Response for `POST /v1/admin/interpretations:sweep`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    /// Expired rows removed.
    pub deleted: u64,
}

/// Request body for `POST /v1/admin/interpretations:reset`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetInterpretationsRequest {
    pub owner: String,
    /// Limit the reset to one cycle. All of the owner's entries otherwise.
    pub cycle_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetInterpretationsResponse {
    pub deleted: u64,
}
