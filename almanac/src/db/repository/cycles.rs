use libsql::{params, Connection};

use super::{format_date, format_timestamp, parse_date, parse_timestamp};
use crate::error::{AlmanacError, Result};
use crate::models::SolarCycle;

pub struct CycleRepository;

impl CycleRepository {
    /// Insert the cycle unless one already exists for `(owner, cycle_label)`,
    /// and return whichever row is stored.
    pub async fn insert_if_absent(conn: &Connection, cycle: &SolarCycle) -> Result<SolarCycle> {
        conn.execute(
            r#"
            INSERT INTO solar_cycles (owner, cycle_label, cycle_start, cycle_end, events, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(owner, cycle_label) DO NOTHING
            "#,
            params![
                cycle.owner.clone(),
                cycle.cycle_label.clone(),
                format_date(cycle.cycle_start),
                format_date(cycle.cycle_end),
                serde_json::to_string(&cycle.events)?,
                format_timestamp(cycle.created_at),
            ],
        )
        .await?;

        Self::get(conn, &cycle.owner, &cycle.cycle_label)
            .await?
            .ok_or_else(|| {
                AlmanacError::Internal(format!(
                    "Cycle {}/{} vanished after insert",
                    cycle.owner, cycle.cycle_label
                ))
            })
    }

    pub async fn get(conn: &Connection, owner: &str, cycle_label: &str) -> Result<Option<SolarCycle>> {
        let mut rows = conn
            .query(
                "SELECT owner, cycle_label, cycle_start, cycle_end, events, created_at
                 FROM solar_cycles WHERE owner = ?1 AND cycle_label = ?2",
                params![owner, cycle_label],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_cycle(&row)?))
        } else {
            Ok(None)
        }
    }

    fn row_to_cycle(row: &libsql::Row) -> Result<SolarCycle> {
        Ok(SolarCycle {
            owner: row.get(0)?,
            cycle_label: row.get(1)?,
            cycle_start: parse_date(&row.get::<String>(2)?)?,
            cycle_end: parse_date(&row.get::<String>(3)?)?,
            events: serde_json::from_str(&row.get::<String>(4)?)?,
            created_at: parse_timestamp(&row.get::<String>(5)?)?,
        })
    }
}
