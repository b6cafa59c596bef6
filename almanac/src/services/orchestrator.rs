use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::InterpretationConfig;
use crate::db::DatabaseBackend;
use crate::error::{AlmanacError, Result};
use crate::interpretation::content::validate_generated;
use crate::interpretation::{fallback_content, GenerationRequest, InterpretationGenerator};
use crate::models::{
    CycleEvent, GenerationContext, NewInterpretation, Origin, ReconcileReport, SolarCycle,
};
use crate::services::validate_owner;

/// Upper bound on the cache lifetime, keeping `now + ttl` representable.
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum in-flight generation calls.
    pub concurrency: usize,
    pub generation_timeout: Duration,
    pub ttl: chrono::Duration,
}

impl From<&InterpretationConfig> for OrchestratorConfig {
    fn from(config: &InterpretationConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            generation_timeout: Duration::from_secs(config.generation_timeout_secs.max(1)),
            ttl: chrono::Duration::seconds(config.ttl_secs.clamp(1, MAX_TTL_SECS) as i64),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub owner: String,
    pub cycle_label: String,
    pub context: GenerationContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Generated,
    Fallback,
    AlreadyCached,
    Failed,
}

/// Fills the interpretation cache for every event of a cycle that has no
/// live entry, with bounded concurrency.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    db: Arc<dyn DatabaseBackend>,
    generator: Arc<dyn InterpretationGenerator>,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
}

impl GenerationOrchestrator {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        generator: Arc<dyn InterpretationGenerator>,
        clock: Arc<dyn Clock>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            db,
            generator,
            clock,
            config,
        }
    }

    /// Generate whatever is missing for the cycle.
    ///
    /// Provider failures never surface here; they turn into fallback entries.
    /// Only a missing cycle, invalid input, or a failed store read aborts the
    /// run.
    pub async fn reconcile(&self, request: ReconcileRequest) -> Result<ReconcileReport> {
        validate_owner(&request.owner)?;

        let cycle = self
            .db
            .get_cycle(&request.owner, &request.cycle_label)
            .await?
            .ok_or_else(|| {
                AlmanacError::NotFound(format!(
                    "Cycle {} for {}",
                    request.cycle_label, request.owner
                ))
            })?;

        let missing = self.missing_events(&cycle).await?;
        if missing.is_empty() {
            debug!(owner = %request.owner, cycle = %request.cycle_label, "Cycle fully cached");
            return Ok(ReconcileReport::default());
        }

        info!(
            owner = %request.owner,
            cycle = %request.cycle_label,
            missing = missing.len(),
            concurrency = self.config.concurrency,
            "Reconciling interpretations"
        );

        let outcomes: Vec<TaskOutcome> = stream::iter(missing)
            .map(|event| self.fill(&request.owner, event, &request.context))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = ReconcileReport::default();
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Generated => report.generated += 1,
                TaskOutcome::Fallback => report.fallback += 1,
                TaskOutcome::AlreadyCached => report.already_cached += 1,
                TaskOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            owner = %request.owner,
            cycle = %request.cycle_label,
            generated = report.generated,
            fallback = report.fallback,
            already_cached = report.already_cached,
            failed = report.failed,
            "Reconcile complete"
        );

        Ok(report)
    }

    /// Events of the cycle with no live cache entry, in cycle order.
    async fn missing_events(&self, cycle: &SolarCycle) -> Result<Vec<CycleEvent>> {
        let present: HashSet<String> = self
            .db
            .list_interpretations(
                &cycle.owner,
                cycle.cycle_start,
                cycle.cycle_end,
                self.clock.now(),
            )
            .await?
            .into_iter()
            .map(|entry| entry.event_identity)
            .collect();

        Ok(cycle
            .events
            .iter()
            .filter(|event| !present.contains(&event.identity))
            .cloned()
            .collect())
    }

    async fn fill(&self, owner: &str, event: CycleEvent, context: &GenerationContext) -> TaskOutcome {
        let request = GenerationRequest {
            owner: owner.to_string(),
            event_identity: event.identity.clone(),
            event: event.event.clone(),
            context: context.clone(),
        };

        let (content, origin) = match self.generate(&request).await {
            Ok(content) => (content, Origin::Generated),
            Err(e) => {
                if e.is_provider_failure() {
                    warn!(owner = %owner, identity = %event.identity, error = %e, "Generation failed, using fallback");
                } else {
                    error!(owner = %owner, identity = %event.identity, error = %e, "Generation error, using fallback");
                }
                (fallback_content(&event.event), Origin::Fallback)
            }
        };

        let entry = NewInterpretation {
            owner: owner.to_string(),
            event_identity: event.identity.clone(),
            kind: event.event.kind.trim().to_lowercase(),
            event_date: event.event.date,
            content,
            origin,
            ttl: self.config.ttl,
        };

        match self.db.put_interpretation(&entry, self.clock.now()).await {
            Ok(outcome) if !outcome.written => {
                debug!(owner = %owner, identity = %event.identity, "Slot already filled by another writer");
                TaskOutcome::AlreadyCached
            }
            Ok(_) => match origin {
                Origin::Fallback => TaskOutcome::Fallback,
                _ => TaskOutcome::Generated,
            },
            Err(e) => {
                error!(owner = %owner, identity = %event.identity, error = %e, "Failed to store interpretation");
                TaskOutcome::Failed
            }
        }
    }

    /// One provider attempt raced against the timeout. On expiry the provider
    /// future is dropped, so a late answer can never be written. Whatever the
    /// generator returns is checked again before it is stored.
    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        match tokio::time::timeout(
            self.config.generation_timeout,
            self.generator.generate(request),
        )
        .await
        {
            Ok(result) => result.and_then(validate_generated),
            Err(_) => Err(AlmanacError::ProviderTimeout(
                self.config.generation_timeout.as_secs(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::StaticChartProvider;
    use crate::clock::FixedClock;
    use crate::config::DatabaseConfig;
    use crate::db::{Database, LibSqlBackend};
    use crate::models::{AstrologicalEvent, BirthProfile};
    use crate::services::CycleService;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::NamedTempFile;

    async fn setup_test_db() -> (Arc<dyn DatabaseBackend>, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let config = DatabaseConfig {
            url: format!("file:{}", temp_file.path().display()),
            auth_token: None,
            local_path: None,
            busy_timeout_ms: 5000,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        };
        let db = Database::new(&config).await.unwrap();
        (Arc::new(LibSqlBackend::new(db)), temp_file)
    }

    /// Scripted generator: fails for subjects listed in `fail_for`, sleeps for
    /// `delay`, and tracks peak concurrency.
    struct ScriptedGenerator {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
        fail_for: Vec<&'static str>,
    }

    impl ScriptedGenerator {
        fn new(delay: Duration, fail_for: Vec<&'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay,
                fail_for,
            }
        }
    }

    #[async_trait]
    impl InterpretationGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_for.iter().any(|s| *s == request.event.subject) {
                return Err(AlmanacError::ProviderMalformedOutput("no fields".to_string()));
            }
            Ok(json!({"title": format!("About {}", request.event.subject)}))
        }
    }

    fn event(subject: &str, day: u32) -> AstrologicalEvent {
        AstrologicalEvent {
            kind: "aspect".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 8, day).unwrap(),
            subject: subject.to_string(),
            sign: None,
            aspect_type: Some("trine".to_string()),
            title: None,
        }
    }

    async fn seeded_cycle(
        db: Arc<dyn DatabaseBackend>,
        clock: Arc<FixedClock>,
        events: Vec<AstrologicalEvent>,
    ) -> SolarCycle {
        let profile = BirthProfile {
            birth_date: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
            birth_time: None,
            latitude: 0.0,
            longitude: 0.0,
            timezone: "UTC".to_string(),
        };
        CycleService::new(db, Arc::new(StaticChartProvider::new(events)), clock)
            .open_cycle("owner-1", &profile, None)
            .await
            .unwrap()
    }

    fn config(concurrency: usize, timeout: Duration) -> OrchestratorConfig {
        OrchestratorConfig {
            concurrency,
            generation_timeout: timeout,
            ttl: chrono::Duration::days(90),
        }
    }

    fn request() -> ReconcileRequest {
        ReconcileRequest {
            owner: "owner-1".to_string(),
            cycle_label: "2025".to_string(),
            context: GenerationContext::default(),
        }
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()))
    }

    #[tokio::test]
    async fn test_reconcile_fills_missing_and_is_idempotent() {
        // Given: a cycle with three events and nothing cached
        let (db, _tmp) = setup_test_db().await;
        let clock = clock();
        seeded_cycle(db.clone(), clock.clone(), vec![event("Sun", 1), event("Moon", 2), event("Mars", 3)]).await;
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(5), vec![]));
        let orchestrator = GenerationOrchestrator::new(
            db.clone(),
            generator.clone(),
            clock.clone(),
            config(3, Duration::from_secs(5)),
        );

        // When: reconciling twice
        let first = orchestrator.reconcile(request()).await.unwrap();
        let second = orchestrator.reconcile(request()).await.unwrap();

        // Then: everything is generated once and the second run does nothing
        assert_eq!(first.generated, 3);
        assert_eq!(first.total(), 3);
        assert_eq!(second, ReconcileReport::default());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_reconcile_respects_concurrency_bound() {
        let (db, _tmp) = setup_test_db().await;
        let clock = clock();
        let events = (1..=8).map(|d| event(&format!("Body{d}"), d)).collect();
        seeded_cycle(db.clone(), clock.clone(), events).await;
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(30), vec![]));
        let orchestrator = GenerationOrchestrator::new(
            db,
            generator.clone(),
            clock,
            config(2, Duration::from_secs(5)),
        );

        let report = orchestrator.reconcile(request()).await.unwrap();

        assert_eq!(report.generated, 8);
        assert!(generator.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_malformed_output_and_timeout_fall_back() {
        // Given: one event the provider rejects and a provider slower than the timeout
        let (db, _tmp) = setup_test_db().await;
        let clock = clock();
        let cycle = seeded_cycle(db.clone(), clock.clone(), vec![event("Sun", 1), event("Moon", 2)]).await;

        let failing = Arc::new(ScriptedGenerator::new(Duration::from_millis(1), vec!["Sun"]));
        let orchestrator = GenerationOrchestrator::new(
            db.clone(),
            failing,
            clock.clone(),
            config(2, Duration::from_secs(5)),
        );
        let report = orchestrator.reconcile(request()).await.unwrap();
        assert_eq!(report.generated, 1);
        assert_eq!(report.fallback, 1);

        let sun = &cycle.events[0];
        let stored = db
            .get_interpretation("owner-1", &sun.identity, clock.now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.origin, Origin::Fallback);
        assert_eq!(stored.content, fallback_content(&sun.event));
    }

    /// Returns `Ok` with a payload no normalizer field recognises.
    struct UnstructuredGenerator;

    #[async_trait]
    impl InterpretationGenerator for UnstructuredGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
            match request.event.subject.as_str() {
                "Sun" => Ok(json!({"score": 7, "notes": ""})),
                _ => Ok(json!("plain text")),
            }
        }
    }

    #[tokio::test]
    async fn test_unvalidated_generator_output_falls_back() {
        // Given: a generator that reports success with unusable payloads
        let (db, _tmp) = setup_test_db().await;
        let clock = clock();
        let cycle = seeded_cycle(db.clone(), clock.clone(), vec![event("Sun", 1), event("Moon", 2)]).await;
        let orchestrator = GenerationOrchestrator::new(
            db.clone(),
            Arc::new(UnstructuredGenerator),
            clock.clone(),
            config(2, Duration::from_secs(5)),
        );

        // When: the cycle is reconciled
        let report = orchestrator.reconcile(request()).await.unwrap();

        // Then: nothing is stored as generated
        assert_eq!(report.generated, 0);
        assert_eq!(report.fallback, 2);
        for event in &cycle.events {
            let stored = db
                .get_interpretation("owner-1", &event.identity, clock.now())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.origin, Origin::Fallback);
            assert_eq!(stored.content, fallback_content(&event.event));
        }
    }

    #[test]
    fn test_zero_durations_are_clamped() {
        let config = OrchestratorConfig::from(&InterpretationConfig {
            ttl_secs: 0,
            concurrency: 0,
            generation_timeout_secs: 0,
            sweep_interval_secs: 0,
        });
        assert_eq!(config.ttl, chrono::Duration::seconds(1));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.generation_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_ttl_config_still_caches_between_runs() {
        let (db, _tmp) = setup_test_db().await;
        let clock = clock();
        seeded_cycle(db.clone(), clock.clone(), vec![event("Mars", 6)]).await;
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO, vec![]));
        let orchestrator = GenerationOrchestrator::new(
            db,
            generator.clone(),
            clock.clone(),
            OrchestratorConfig::from(&InterpretationConfig {
                ttl_secs: 0,
                ..InterpretationConfig::default()
            }),
        );

        assert_eq!(orchestrator.reconcile(request()).await.unwrap().generated, 1);
        assert_eq!(orchestrator.reconcile(request()).await.unwrap().generated, 0);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_produces_fallback_without_provider_text() {
        let (db, _tmp) = setup_test_db().await;
        let clock = clock();
        let cycle = seeded_cycle(db.clone(), clock.clone(), vec![event("Saturn", 4)]).await;

        let slow = Arc::new(ScriptedGenerator::new(Duration::from_millis(500), vec![]));
        let orchestrator = GenerationOrchestrator::new(
            db.clone(),
            slow,
            clock.clone(),
            config(1, Duration::from_millis(20)),
        );

        let report = orchestrator.reconcile(request()).await.unwrap();
        assert_eq!(report.fallback, 1);
        assert_eq!(report.generated, 0);

        // The dropped provider call must not land a late write.
        tokio::time::sleep(Duration::from_millis(600)).await;
        let stored = db
            .get_interpretation("owner-1", &cycle.events[0].identity, clock.now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.origin, Origin::Fallback);
        assert!(!stored.content.to_string().contains("About Saturn"));
    }

    #[tokio::test]
    async fn test_expired_entries_are_regenerated() {
        let (db, _tmp) = setup_test_db().await;
        let clock = clock();
        seeded_cycle(db.clone(), clock.clone(), vec![event("Venus", 5)]).await;
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(1), vec![]));
        let mut short_ttl = config(1, Duration::from_secs(5));
        short_ttl.ttl = chrono::Duration::hours(1);
        let orchestrator = GenerationOrchestrator::new(db, generator.clone(), clock.clone(), short_ttl);

        assert_eq!(orchestrator.reconcile(request()).await.unwrap().generated, 1);
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(orchestrator.reconcile(request()).await.unwrap().generated, 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_cycle_is_not_found() {
        let (db, _tmp) = setup_test_db().await;
        let orchestrator = GenerationOrchestrator::new(
            db,
            Arc::new(ScriptedGenerator::new(Duration::ZERO, vec![])),
            clock(),
            config(1, Duration::from_secs(1)),
        );

        let err = orchestrator.reconcile(request()).await.unwrap_err();
        assert!(matches!(err, AlmanacError::NotFound(_)));
    }

    #[test]
    fn test_config_from_interpretation_config() {
        let config = OrchestratorConfig::from(&InterpretationConfig {
            ttl_secs: 60,
            concurrency: 0,
            generation_timeout_secs: 7,
            sweep_interval_secs: 10,
        });
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.generation_timeout, Duration::from_secs(7));
        assert_eq!(config.ttl, chrono::Duration::seconds(60));
    }
}
