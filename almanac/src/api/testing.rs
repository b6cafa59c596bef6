use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::NamedTempFile;

use crate::chart::StaticChartProvider;
use crate::clock::FixedClock;
use crate::config::{
    CalendarConfig, ChartConfig, Config, DatabaseConfig, InterpretationConfig, ServerConfig,
};
use crate::db::{Database, DatabaseBackend, LibSqlBackend};
use crate::interpretation::LlmGenerator;
use crate::llm::LlmProvider;
use crate::models::AstrologicalEvent;

use super::AppState;

pub(crate) struct TestApp {
    pub state: AppState,
    pub clock: FixedClock,
    _db_file: NamedTempFile,
}

pub(crate) fn sample_events() -> Vec<AstrologicalEvent> {
    vec![
        AstrologicalEvent {
            kind: "lunar-phase".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
            subject: "Moon".to_string(),
            sign: Some("Capricorn".to_string()),
            aspect_type: None,
            title: Some("Full Moon".to_string()),
        },
        AstrologicalEvent {
            kind: "eclipse".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 9, 21).unwrap(),
            subject: "Sun".to_string(),
            sign: Some("Virgo".to_string()),
            aspect_type: None,
            title: None,
        },
    ]
}

/// App state over a fresh file database, a fixed clock at 2025-07-01 and an
/// unavailable LLM, so every generation falls back.
pub(crate) async fn test_app(api_keys: Vec<String>) -> TestApp {
    let db_file = NamedTempFile::new().unwrap();
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_keys,
        },
        database: DatabaseConfig {
            url: format!("file:{}", db_file.path().display()),
            auth_token: None,
            local_path: None,
            busy_timeout_ms: 1000,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        },
        llm: None,
        chart: ChartConfig {
            provider_url: None,
            timeout_secs: 5,
        },
        interpretation: InterpretationConfig {
            generation_timeout_secs: 5,
            ..InterpretationConfig::default()
        },
        calendar: CalendarConfig::default(),
    };

    let database = Database::new(&config.database).await.unwrap();
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(database));
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap());
    let llm = LlmProvider::unavailable("not configured in tests");
    let generator = Arc::new(LlmGenerator::new(llm.clone()));
    let chart = Arc::new(StaticChartProvider::new(sample_events()));

    let state = AppState::new(config, db, chart, generator, llm, Arc::new(clock.clone()));

    TestApp {
        state,
        clock,
        _db_file: db_file,
    }
}
