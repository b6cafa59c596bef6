use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One cached interpretation per (owner, event). Timestamps are
        -- fixed-width RFC 3339 UTC so string comparison is chronological.
        CREATE TABLE IF NOT EXISTS event_interpretations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            event_identity TEXT NOT NULL,
            kind TEXT NOT NULL,
            event_date TEXT NOT NULL,
            content TEXT NOT NULL,
            origin TEXT NOT NULL,
            generated_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            UNIQUE (owner, event_identity)
        );

        CREATE INDEX IF NOT EXISTS idx_event_interpretations_expires_at
            ON event_interpretations(expires_at);
        CREATE INDEX IF NOT EXISTS idx_event_interpretations_owner_date
            ON event_interpretations(owner, event_date);

        -- Solar cycles with their resolved event lists
        CREATE TABLE IF NOT EXISTS solar_cycles (
            owner TEXT NOT NULL,
            cycle_label TEXT NOT NULL,
            cycle_start TEXT NOT NULL,
            cycle_end TEXT NOT NULL,
            events TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            PRIMARY KEY (owner, cycle_label)
        );
        "#,
    )
    .await?;

    Ok(())
}
