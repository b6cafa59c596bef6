use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::db::DatabaseBackend;
use crate::error::Result;

/// Periodically removes expired interpretations.
#[derive(Clone)]
pub struct SweepManager {
    db: Arc<dyn DatabaseBackend>,
    clock: Arc<dyn Clock>,
    interval_secs: u64,
}

impl SweepManager {
    pub fn new(db: Arc<dyn DatabaseBackend>, clock: Arc<dyn Clock>, interval_secs: u64) -> Self {
        Self {
            db,
            clock,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Run a single sweep.
    ///
    /// The cutoff is taken once when the sweep starts; rows written while it
    /// runs expire in the future and are left alone. Returns the number of
    /// rows deleted.
    pub async fn run_once(&self) -> Result<u64> {
        let cutoff = self.clock.now();
        debug!(cutoff = %cutoff, "Sweeping expired interpretations");

        let deleted = self.db.sweep_expired_interpretations(cutoff).await?;

        if deleted > 0 {
            info!(deleted, "Expired interpretations swept");
        } else {
            debug!("No expired interpretations to sweep");
        }

        Ok(deleted)
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}
