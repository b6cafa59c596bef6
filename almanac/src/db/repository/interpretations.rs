use chrono::{DateTime, NaiveDate, Utc};
use libsql::{params, Connection};

use super::{format_date, format_timestamp, parse_date, parse_timestamp};
use crate::error::Result;
use crate::models::{CyclePeriod, InterpretationEntry, NewInterpretation, Origin, PutOutcome};

const COLUMNS: &str = "id, owner, event_identity, kind, event_date, content, origin, generated_at, expires_at";

pub struct InterpretationRepository;

impl InterpretationRepository {
    /// Live entry for the slot. Expired rows read as absent.
    pub async fn get(
        conn: &Connection,
        owner: &str,
        event_identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<InterpretationEntry>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM event_interpretations
             WHERE owner = ?1 AND event_identity = ?2 AND expires_at > ?3"
        );
        let mut rows = conn
            .query(&sql, params![owner, event_identity, format_timestamp(now)])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_entry(&row)?))
        } else {
            Ok(None)
        }
    }

    /// First-writer-wins insert.
    ///
    /// A single upsert that only overwrites an existing row when it has
    /// expired, so concurrent writers for the same slot converge on whichever
    /// landed first.
    pub async fn put(
        conn: &Connection,
        entry: &NewInterpretation,
        now: DateTime<Utc>,
    ) -> Result<PutOutcome> {
        let generated_at = format_timestamp(now);
        let expires_at = format_timestamp(now + entry.ttl);

        let changed = conn
            .execute(
                r#"
                INSERT INTO event_interpretations (
                    owner, event_identity, kind, event_date, content, origin, generated_at, expires_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(owner, event_identity) DO UPDATE SET
                    kind = excluded.kind,
                    event_date = excluded.event_date,
                    content = excluded.content,
                    origin = excluded.origin,
                    generated_at = excluded.generated_at,
                    expires_at = excluded.expires_at
                WHERE event_interpretations.expires_at <= excluded.generated_at
                "#,
                params![
                    entry.owner.clone(),
                    entry.event_identity.clone(),
                    entry.kind.clone(),
                    format_date(entry.event_date),
                    serde_json::to_string(&entry.content)?,
                    entry.origin.to_string(),
                    generated_at,
                    expires_at,
                ],
            )
            .await?;

        let written = changed > 0;
        let sql = format!(
            "SELECT {COLUMNS} FROM event_interpretations WHERE owner = ?1 AND event_identity = ?2"
        );
        let mut rows = conn
            .query(&sql, params![entry.owner.clone(), entry.event_identity.clone()])
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            crate::error::AlmanacError::Internal(format!(
                "Interpretation for {} vanished after write",
                entry.event_identity
            ))
        })?;

        let mut stored = Self::row_to_entry(&row)?;
        if !written {
            stored.origin = Origin::CachedRead;
        }

        Ok(PutOutcome {
            entry: stored,
            written,
        })
    }

    /// Live entries with `start <= event_date < end`, ordered by date then identity.
    pub async fn list_by_owner_and_date_range(
        conn: &Connection,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<InterpretationEntry>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM event_interpretations
             WHERE owner = ?1 AND event_date >= ?2 AND event_date < ?3 AND expires_at > ?4
             ORDER BY event_date ASC, event_identity ASC"
        );
        let mut rows = conn
            .query(
                &sql,
                params![owner, format_date(start), format_date(end), format_timestamp(now)],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_entry(&row)?);
        }
        Ok(results)
    }

    pub async fn delete_expired(conn: &Connection, now: DateTime<Utc>) -> Result<u64> {
        let deleted = conn
            .execute(
                "DELETE FROM event_interpretations WHERE expires_at <= ?1",
                params![format_timestamp(now)],
            )
            .await?;
        Ok(deleted)
    }

    pub async fn delete_for_owner(
        conn: &Connection,
        owner: &str,
        period: Option<CyclePeriod>,
    ) -> Result<u64> {
        let deleted = match period {
            Some(period) => {
                conn.execute(
                    "DELETE FROM event_interpretations
                     WHERE owner = ?1 AND event_date >= ?2 AND event_date < ?3",
                    params![owner, format_date(period.start), format_date(period.end)],
                )
                .await?
            }
            None => {
                conn.execute(
                    "DELETE FROM event_interpretations WHERE owner = ?1",
                    params![owner],
                )
                .await?
            }
        };
        Ok(deleted)
    }

    fn row_to_entry(row: &libsql::Row) -> Result<InterpretationEntry> {
        let raw_content = row.get::<String>(5)?;
        // Stored content is never normalized; unparsable text is kept verbatim.
        let content = serde_json::from_str(&raw_content)
            .unwrap_or(serde_json::Value::String(raw_content));

        Ok(InterpretationEntry {
            id: row.get(0)?,
            owner: row.get(1)?,
            event_identity: row.get(2)?,
            kind: row.get(3)?,
            event_date: parse_date(&row.get::<String>(4)?)?,
            content,
            origin: row
                .get::<String>(6)?
                .parse()
                .unwrap_or(Origin::Generated),
            generated_at: parse_timestamp(&row.get::<String>(7)?)?,
            expires_at: parse_timestamp(&row.get::<String>(8)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    async fn setup_test_db() -> (Connection, tempfile::NamedTempFile) {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let db = libsql::Builder::new_local(tmp.path())
            .build()
            .await
            .unwrap();
        let conn = db.connect().unwrap();
        init_schema(&conn).await.unwrap();
        (conn, tmp)
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    fn new_entry(identity: &str, day: u32, origin: Origin, text: &str) -> NewInterpretation {
        NewInterpretation {
            owner: "owner-1".to_string(),
            event_identity: identity.to_string(),
            kind: "aspect".to_string(),
            event_date: NaiveDate::from_ymd_opt(2025, 4, day).unwrap(),
            content: json!({"summary": text}),
            origin,
            ttl: Duration::hours(2),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (conn, _tmp) = setup_test_db().await;

        let outcome = InterpretationRepository::put(&conn, &new_entry("a", 1, Origin::Generated, "one"), at(10))
            .await
            .unwrap();
        assert!(outcome.written);
        assert_eq!(outcome.entry.origin, Origin::Generated);
        assert_eq!(outcome.entry.generated_at, at(10));
        assert_eq!(outcome.entry.expires_at, at(12));

        let fetched = InterpretationRepository::get(&conn, "owner-1", "a", at(11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, outcome.entry);
    }

    #[tokio::test]
    async fn test_put_does_not_overwrite_live_entry() {
        let (conn, _tmp) = setup_test_db().await;

        InterpretationRepository::put(&conn, &new_entry("a", 1, Origin::Fallback, "first"), at(10))
            .await
            .unwrap();
        let second = InterpretationRepository::put(&conn, &new_entry("a", 1, Origin::Generated, "second"), at(11))
            .await
            .unwrap();

        assert!(!second.written);
        assert_eq!(second.entry.origin, Origin::CachedRead);
        assert_eq!(second.entry.content["summary"], "first");

        let stored = InterpretationRepository::get(&conn, "owner-1", "a", at(11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.origin, Origin::Fallback);
        assert_eq!(stored.generated_at, at(10));
    }

    #[tokio::test]
    async fn test_expired_entry_is_invisible_and_replaceable() {
        let (conn, _tmp) = setup_test_db().await;

        InterpretationRepository::put(&conn, &new_entry("a", 1, Origin::Fallback, "old"), at(8))
            .await
            .unwrap();

        // Expires exactly at 10:00.
        assert!(InterpretationRepository::get(&conn, "owner-1", "a", at(10))
            .await
            .unwrap()
            .is_none());

        let replaced = InterpretationRepository::put(&conn, &new_entry("a", 1, Origin::Generated, "new"), at(10))
            .await
            .unwrap();
        assert!(replaced.written);
        assert_eq!(replaced.entry.content["summary"], "new");
        assert_eq!(replaced.entry.generated_at, at(10));
        assert_eq!(replaced.entry.expires_at, at(12));
    }

    #[tokio::test]
    async fn test_list_by_range_filters_and_orders() {
        let (conn, _tmp) = setup_test_db().await;

        for (identity, day) in [("c", 3), ("b", 1), ("a", 1), ("z", 30)] {
            InterpretationRepository::put(&conn, &new_entry(identity, day, Origin::Generated, identity), at(10))
                .await
                .unwrap();
        }

        let listed = InterpretationRepository::list_by_owner_and_date_range(
            &conn,
            "owner-1",
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
            at(11),
        )
        .await
        .unwrap();

        let identities: Vec<_> = listed.iter().map(|e| e.event_identity.as_str()).collect();
        assert_eq!(identities, vec!["a", "b", "c"]);

        let after_expiry = InterpretationRepository::list_by_owner_and_date_range(
            &conn,
            "owner-1",
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            at(12),
        )
        .await
        .unwrap();
        assert!(after_expiry.is_empty());
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_later_writes() {
        let (conn, _tmp) = setup_test_db().await;

        InterpretationRepository::put(&conn, &new_entry("old", 1, Origin::Generated, "x"), at(6))
            .await
            .unwrap();
        InterpretationRepository::put(&conn, &new_entry("fresh", 2, Origin::Generated, "y"), at(9))
            .await
            .unwrap();

        let deleted = InterpretationRepository::delete_expired(&conn, at(9)).await.unwrap();
        assert_eq!(deleted, 1);

        let again = InterpretationRepository::delete_expired(&conn, at(9)).await.unwrap();
        assert_eq!(again, 0);

        assert!(InterpretationRepository::get(&conn, "owner-1", "fresh", at(9))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_delete_for_owner_with_period() {
        let (conn, _tmp) = setup_test_db().await;

        InterpretationRepository::put(&conn, &new_entry("a", 1, Origin::Generated, "x"), at(10))
            .await
            .unwrap();
        InterpretationRepository::put(&conn, &new_entry("b", 20, Origin::Generated, "y"), at(10))
            .await
            .unwrap();

        let period = CyclePeriod {
            start: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
        };
        assert_eq!(
            InterpretationRepository::delete_for_owner(&conn, "owner-1", Some(period))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            InterpretationRepository::delete_for_owner(&conn, "owner-1", None)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_unparsable_content_is_kept_verbatim() {
        let (conn, _tmp) = setup_test_db().await;

        conn.execute(
            "INSERT INTO event_interpretations
             (owner, event_identity, kind, event_date, content, origin, generated_at, expires_at)
             VALUES ('owner-1', 'legacy', 'aspect', '2025-04-01', 'plain words', 'generated',
                     '2025-03-01T10:00:00.000000Z', '2025-03-01T12:00:00.000000Z')",
            (),
        )
        .await
        .unwrap();

        let entry = InterpretationRepository::get(&conn, "owner-1", "legacy", at(11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.content, json!("plain words"));
    }
}
