//! Cycle, reconcile and interpretation DTOs for the v1 API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    BirthProfile, CycleEvent, GenerationContext, Origin, ReconcileReport, SolarCycle,
};
use crate::services::EventInterpretationView;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Birth data forwarded to the chart provider. Never stored.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BirthProfileDto {
    pub birth_date: NaiveDate,
    /// Local time of birth, `HH:MM`.
    pub birth_time: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone name, e.g. `Europe/Paris`.
    pub timezone: String,
}

impl From<BirthProfileDto> for BirthProfile {
    fn from(dto: BirthProfileDto) -> Self {
        BirthProfile {
            birth_date: dto.birth_date,
            birth_time: dto.birth_time,
            latitude: dto.latitude,
            longitude: dto.longitude,
            timezone: dto.timezone,
        }
    }
}

/// Request body for `POST /v1/cycles`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenCycleRequest {
    pub owner: String,
    pub birth_profile: BirthProfileDto,
    /// Any date inside the wanted cycle. Defaults to today (UTC).
    pub reference_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContextDto {
    pub display_name: Option<String>,
    /// Free text about the natal chart, passed into prompts.
    pub chart_summary: Option<String>,
    /// Output language, e.g. `en` or `fr`.
    pub language: Option<String>,
}

impl From<GenerationContextDto> for GenerationContext {
    fn from(dto: GenerationContextDto) -> Self {
        GenerationContext {
            display_name: dto.display_name,
            chart_summary: dto.chart_summary,
            language: dto.language,
        }
    }
}

/// Request body for `POST /v1/cycles/{owner}/{label}/reconcile`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequestBody {
    #[serde(default)]
    pub context: Option<GenerationContextDto>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CycleEventResponse {
    /// Stable key of the event within the owner's cache.
    pub identity: String,
    pub kind: String,
    pub date: NaiveDate,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_type: Option<String>,
    pub title: String,
}

impl From<CycleEvent> for CycleEventResponse {
    fn from(event: CycleEvent) -> Self {
        let title = event.event.display_title();
        CycleEventResponse {
            identity: event.identity,
            kind: event.event.kind,
            date: event.event.date,
            subject: event.event.subject,
            sign: event.event.sign,
            aspect_type: event.event.aspect_type,
            title,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CycleResponse {
    pub owner: String,
    pub cycle_label: String,
    pub cycle_start: NaiveDate,
    /// Exclusive.
    pub cycle_end: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub events: Vec<CycleEventResponse>,
}

impl From<SolarCycle> for CycleResponse {
    fn from(cycle: SolarCycle) -> Self {
        CycleResponse {
            owner: cycle.owner,
            cycle_label: cycle.cycle_label,
            cycle_start: cycle.cycle_start,
            cycle_end: cycle.cycle_end,
            created_at: cycle.created_at,
            events: cycle.events.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub generated: usize,
    pub fallback: usize,
    pub already_cached: usize,
    /// Store writes that failed; these events stay missing until the next run.
    pub failed: usize,
}

impl From<ReconcileReport> for ReconcileResponse {
    fn from(report: ReconcileReport) -> Self {
        ReconcileResponse {
            generated: report.generated,
            fallback: report.fallback,
            already_cached: report.already_cached,
            failed: report.failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum V1Origin {
    Generated,
    Fallback,
    CachedRead,
}

impl From<Origin> for V1Origin {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Generated => V1Origin::Generated,
            Origin::Fallback => V1Origin::Fallback,
            Origin::CachedRead => V1Origin::CachedRead,
        }
    }
}

/// One event with its cached interpretation, if any.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventInterpretationResponse {
    pub event: CycleEventResponse,
    /// Absent when nothing live is cached for the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<V1Origin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Raw stored payload, in whatever shape it was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub content: Option<serde_json::Value>,
    /// Plain-text rendering of `content`; empty when nothing is cached.
    pub description: String,
}

impl From<EventInterpretationView> for EventInterpretationResponse {
    fn from(view: EventInterpretationView) -> Self {
        let (origin, generated_at, expires_at, content) = match view.entry {
            Some(entry) => (
                Some(entry.origin.into()),
                Some(entry.generated_at),
                Some(entry.expires_at),
                Some(entry.content),
            ),
            None => (None, None, None, None),
        };

        EventInterpretationResponse {
            event: view.event.into(),
            origin,
            generated_at,
            expires_at,
            content,
            description: view.description,
        }
    }
}
