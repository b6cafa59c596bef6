use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use validator::Validate;

use crate::chart::ChartProvider;
use crate::clock::Clock;
use crate::cycle::{assign_identities, period_for};
use crate::db::DatabaseBackend;
use crate::error::{AlmanacError, Result};
use crate::interpretation::normalize_content;
use crate::models::{BirthProfile, CycleEvent, InterpretationEntry, SolarCycle};

const MAX_OWNER_LEN: usize = 256;

/// One event of a cycle with whatever interpretation is currently cached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInterpretationView {
    pub event: CycleEvent,
    pub entry: Option<InterpretationEntry>,
    /// Normalized text, empty when nothing is cached yet.
    pub description: String,
}

/// Builds and looks up solar cycles.
#[derive(Clone)]
pub struct CycleService {
    db: Arc<dyn DatabaseBackend>,
    chart: Arc<dyn ChartProvider>,
    clock: Arc<dyn Clock>,
}

impl CycleService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        chart: Arc<dyn ChartProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { db, chart, clock }
    }

    /// Return the owner's cycle containing `reference` (today by default),
    /// computing and storing it on first request.
    pub async fn open_cycle(
        &self,
        owner: &str,
        profile: &BirthProfile,
        reference: Option<NaiveDate>,
    ) -> Result<SolarCycle> {
        validate_owner(owner)?;
        profile.validate()?;

        let reference = reference.unwrap_or_else(|| self.clock.today());
        let period = period_for(profile.birth_date, reference)?;
        let label = period.label();

        if let Some(existing) = self.db.get_cycle(owner, &label).await? {
            return Ok(existing);
        }

        let raw_events = self.chart.events(profile, period).await?;
        let total = raw_events.len();
        let in_period: Vec<_> = raw_events
            .into_iter()
            .filter(|event| {
                let keep = period.contains(event.date);
                if !keep {
                    tracing::warn!(
                        owner = %owner,
                        date = %event.date,
                        kind = %event.kind,
                        "Dropping chart event outside cycle period"
                    );
                }
                keep
            })
            .collect();

        let events = assign_identities(in_period);
        tracing::info!(
            owner = %owner,
            cycle = %label,
            received = total,
            events = events.len(),
            "Opening solar cycle"
        );

        let cycle = SolarCycle {
            owner: owner.to_string(),
            cycle_label: label,
            cycle_start: period.start,
            cycle_end: period.end,
            events,
            created_at: self.clock.now(),
        };

        self.db.insert_cycle_if_absent(&cycle).await
    }

    pub async fn get_cycle(&self, owner: &str, cycle_label: &str) -> Result<SolarCycle> {
        validate_owner(owner)?;
        self.db
            .get_cycle(owner, cycle_label)
            .await?
            .ok_or_else(|| AlmanacError::NotFound(format!("Cycle {cycle_label} for {owner}")))
    }

    /// Every event of the cycle paired with its live cached interpretation.
    pub async fn interpretations(
        &self,
        owner: &str,
        cycle_label: &str,
    ) -> Result<Vec<EventInterpretationView>> {
        let cycle = self.get_cycle(owner, cycle_label).await?;
        let mut entries: HashMap<String, InterpretationEntry> = self
            .db
            .list_interpretations(owner, cycle.cycle_start, cycle.cycle_end, self.clock.now())
            .await?
            .into_iter()
            .map(|entry| (entry.event_identity.clone(), entry))
            .collect();

        Ok(cycle
            .events
            .into_iter()
            .map(|event| {
                let entry = entries.remove(&event.identity);
                let description = entry
                    .as_ref()
                    .map(|e| normalize_content(&e.content))
                    .unwrap_or_default();
                EventInterpretationView {
                    event,
                    entry,
                    description,
                }
            })
            .collect())
    }
}

pub(crate) fn validate_owner(owner: &str) -> Result<()> {
    if owner.trim().is_empty() {
        return Err(AlmanacError::Validation("owner must not be empty".to_string()));
    }
    if owner.len() > MAX_OWNER_LEN {
        return Err(AlmanacError::Validation(format!(
            "owner must be at most {MAX_OWNER_LEN} bytes"
        )));
    }
    Ok(())
}
