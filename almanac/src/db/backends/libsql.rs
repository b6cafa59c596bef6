use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::db::connection::Database;
use crate::db::repository::{CycleRepository, InterpretationRepository};
use crate::db::traits::{CycleStore, DatabaseBackend, InterpretationStore};
use crate::error::Result;
use crate::models::{CyclePeriod, InterpretationEntry, NewInterpretation, PutOutcome, SolarCycle};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InterpretationStore for LibSqlBackend {
    async fn get_interpretation(
        &self,
        owner: &str,
        event_identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<InterpretationEntry>> {
        let conn = self.db.connect()?;
        InterpretationRepository::get(&conn, owner, event_identity, now).await
    }

    async fn put_interpretation(
        &self,
        entry: &NewInterpretation,
        now: DateTime<Utc>,
    ) -> Result<PutOutcome> {
        let conn = self.db.connect()?;
        InterpretationRepository::put(&conn, entry, now).await
    }

    async fn list_interpretations(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<InterpretationEntry>> {
        let conn = self.db.connect()?;
        InterpretationRepository::list_by_owner_and_date_range(&conn, owner, start, end, now).await
    }

    async fn sweep_expired_interpretations(&self, now: DateTime<Utc>) -> Result<u64> {
        let conn = self.db.connect()?;
        InterpretationRepository::delete_expired(&conn, now).await
    }

    async fn reset_interpretations(
        &self,
        owner: &str,
        period: Option<CyclePeriod>,
    ) -> Result<u64> {
        let conn = self.db.connect()?;
        InterpretationRepository::delete_for_owner(&conn, owner, period).await
    }
}

#[async_trait]
impl CycleStore for LibSqlBackend {
    async fn insert_cycle_if_absent(&self, cycle: &SolarCycle) -> Result<SolarCycle> {
        let conn = self.db.connect()?;
        CycleRepository::insert_if_absent(&conn, cycle).await
    }

    async fn get_cycle(&self, owner: &str, cycle_label: &str) -> Result<Option<SolarCycle>> {
        let conn = self.db.connect()?;
        CycleRepository::get(&conn, owner, cycle_label).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}
