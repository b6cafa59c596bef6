use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChartConfig;
use crate::error::{AlmanacError, Result};
use crate::models::{AstrologicalEvent, BirthProfile, CyclePeriod};

/// Computes the calendar events of a solar cycle from birth data.
#[async_trait]
pub trait ChartProvider: Send + Sync {
    async fn events(
        &self,
        profile: &BirthProfile,
        period: CyclePeriod,
    ) -> Result<Vec<AstrologicalEvent>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartRequest<'a> {
    birth_profile: &'a BirthProfile,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    events: Vec<AstrologicalEvent>,
}

/// Chart provider reached over HTTP.
#[derive(Clone)]
pub struct HttpChartProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpChartProvider {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                AlmanacError::ChartProvider(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ChartProvider for HttpChartProvider {
    async fn events(
        &self,
        profile: &BirthProfile,
        period: CyclePeriod,
    ) -> Result<Vec<AstrologicalEvent>> {
        let request = ChartRequest {
            birth_profile: profile,
            start: period.start,
            end: period.end,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AlmanacError::ChartProvider(format!("Chart request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlmanacError::ChartProvider(format!(
                "Chart provider returned {status}"
            )));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| AlmanacError::ChartProvider(format!("Invalid chart response: {e}")))?;

        tracing::debug!(
            count = body.events.len(),
            start = %period.start,
            end = %period.end,
            "Chart events received"
        );
        Ok(body.events)
    }
}

/// Fixed event list. Used when no chart provider is configured and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticChartProvider {
    events: Vec<AstrologicalEvent>,
}

impl StaticChartProvider {
    pub fn new(events: Vec<AstrologicalEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl ChartProvider for StaticChartProvider {
    async fn events(
        &self,
        _profile: &BirthProfile,
        period: CyclePeriod,
    ) -> Result<Vec<AstrologicalEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| period.contains(e.date))
            .cloned()
            .collect())
    }
}

/// Build the chart provider described by configuration.
pub fn chart_provider_from_config(config: &ChartConfig) -> Result<Arc<dyn ChartProvider>> {
    match config.provider_url.as_deref() {
        Some(url) => Ok(Arc::new(HttpChartProvider::new(url, config.timeout_secs)?)),
        None => {
            tracing::warn!("CHART_PROVIDER_URL not set; new cycles will have no events");
            Ok(Arc::new(StaticChartProvider::default()))
        }
    }
}
