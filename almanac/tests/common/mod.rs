#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use almanac::clock::FixedClock;
use almanac::config::{DatabaseConfig, LlmConfig};
use almanac::db::{Database, DatabaseBackend, LibSqlBackend};
use almanac::models::{AstrologicalEvent, BirthProfile};

/// File-backed database; keep the returned file alive for the test duration.
pub async fn temp_backend() -> (Arc<dyn DatabaseBackend>, NamedTempFile) {
    let tmp = NamedTempFile::new().expect("temp file");
    let config = DatabaseConfig {
        url: format!("file:{}", tmp.path().display()),
        auth_token: None,
        local_path: None,
        busy_timeout_ms: 5000,
        journal_mode: "WAL".to_string(),
        synchronous: "NORMAL".to_string(),
    };
    let db = Database::new(&config).await.expect("database");
    (Arc::new(LibSqlBackend::new(db)), tmp)
}

/// 2025-07-01 08:00 UTC, inside the 2025 cycle of [`birth_profile`].
pub fn fixed_clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap())
}

pub fn birth_profile() -> BirthProfile {
    BirthProfile {
        birth_date: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
        birth_time: Some("06:45".to_string()),
        latitude: 52.52,
        longitude: 13.40,
        timezone: "Europe/Berlin".to_string(),
    }
}

pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
}

pub fn event(kind: &str, date: (i32, u32, u32), subject: &str) -> AstrologicalEvent {
    AstrologicalEvent {
        kind: kind.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        subject: subject.to_string(),
        sign: None,
        aspect_type: None,
        title: None,
    }
}

pub fn cycle_events() -> Vec<AstrologicalEvent> {
    vec![
        AstrologicalEvent {
            sign: Some("Gemini".to_string()),
            ..event("planetary-ingress", (2025, 7, 7), "Uranus")
        },
        AstrologicalEvent {
            aspect_type: Some("square".to_string()),
            ..event("aspect", (2025, 8, 12), "Sun-Saturn")
        },
        AstrologicalEvent {
            sign: Some("Virgo".to_string()),
            title: Some("Solar Eclipse in Virgo".to_string()),
            ..event("eclipse", (2025, 9, 21), "Sun")
        },
    ]
}

pub fn llm_config(base_url: &str) -> LlmConfig {
    LlmConfig {
        model: "openai/gpt-4o-mini".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url.to_string()),
        timeout_secs: 5,
        token_url: None,
        client_id: None,
        client_secret: None,
        temperature: None,
        max_tokens: None,
    }
}

/// OpenAI chat completion body carrying `content` as the assistant message.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 30, "total_tokens": 42}
    })
}

/// Undo RFC 5545 line folding.
pub fn unfold(ics: &str) -> String {
    ics.replace("\r\n ", "")
}
