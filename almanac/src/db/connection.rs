use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

/// Shared handle to the libsql database. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct Database {
    db: Arc<libsql::Database>,
    pragmas: Arc<Pragmas>,
}

#[derive(Debug)]
struct Pragmas {
    busy_timeout_ms: u64,
    journal_mode: &'static str,
    synchronous: &'static str,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            let auth_token = config.auth_token.clone().unwrap_or_default();
            match config.local_path {
                Some(ref local_path) => {
                    Builder::new_remote_replica(local_path, config.url.clone(), auth_token)
                        .build()
                        .await?
                }
                None => Builder::new_remote(config.url.clone(), auth_token).build().await?,
            }
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self {
            db: Arc::new(db),
            pragmas: Arc::new(Pragmas {
                busy_timeout_ms: config.busy_timeout_ms,
                journal_mode: normalize_journal_mode(&config.journal_mode),
                synchronous: normalize_synchronous(&config.synchronous),
            }),
        };
        database.configure_database().await?;
        schema::init_schema(&database.connect()?).await?;

        Ok(database)
    }

    /// New connection with the configured busy timeout.
    pub fn connect(&self) -> Result<Connection> {
        let conn = self.db.connect()?;
        let timeout = std::time::Duration::from_millis(self.pragmas.busy_timeout_ms);
        if let Err(error) = conn.busy_timeout(timeout) {
            tracing::debug!(error = %error, "Busy timeout not supported on this connection");
        }
        Ok(conn)
    }

    async fn configure_database(&self) -> Result<()> {
        let conn = self.connect()?;
        let statements = [
            format!("PRAGMA journal_mode = {}", self.pragmas.journal_mode),
            format!("PRAGMA synchronous = {}", self.pragmas.synchronous),
        ];

        for sql in statements {
            if let Err(error) = conn.execute_batch(&sql).await {
                tracing::warn!(sql = %sql, error = %error, "Failed to apply SQLite pragma");
            }
        }

        Ok(())
    }

    pub async fn sync(&self) -> Result<()> {
        if let Ok(sync) = self.db.sync().await {
            tracing::info!("Database synced: {:?}", sync);
        }
        Ok(())
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}
