use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{CyclePeriod, InterpretationEntry, NewInterpretation, PutOutcome, SolarCycle};

/// Durable cache of event interpretations.
///
/// At most one row exists per `(owner, event_identity)`. Reads treat rows
/// whose `expires_at <= now` as absent.
#[async_trait]
pub trait InterpretationStore: Send + Sync {
    async fn get_interpretation(
        &self,
        owner: &str,
        event_identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<InterpretationEntry>>;

    /// Write unless a live row already holds the slot. Never fails on conflict.
    async fn put_interpretation(
        &self,
        entry: &NewInterpretation,
        now: DateTime<Utc>,
    ) -> Result<PutOutcome>;

    async fn list_interpretations(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<InterpretationEntry>>;

    /// Delete rows expired as of `now`. Returns the number removed.
    async fn sweep_expired_interpretations(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Administrative delete of an owner's entries, optionally limited to a period.
    async fn reset_interpretations(&self, owner: &str, period: Option<CyclePeriod>)
        -> Result<u64>;
}

/// Stored solar cycles, unique per `(owner, cycle_label)`.
#[async_trait]
pub trait CycleStore: Send + Sync {
    /// Returns the stored cycle, which is `cycle` only if none existed.
    async fn insert_cycle_if_absent(&self, cycle: &SolarCycle) -> Result<SolarCycle>;
    async fn get_cycle(&self, owner: &str, cycle_label: &str) -> Result<Option<SolarCycle>>;
}

#[async_trait]
pub trait DatabaseBackend: InterpretationStore + CycleStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;
}
