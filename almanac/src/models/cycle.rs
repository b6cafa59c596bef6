use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Birth data forwarded to the chart provider. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BirthProfile {
    pub birth_date: NaiveDate,
    #[validate(custom(function = "validate_birth_time"))]
    pub birth_time: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(length(min = 1, max = 64))]
    pub timezone: String,
}

fn validate_birth_time(value: &str) -> Result<(), ValidationError> {
    match chrono::NaiveTime::parse_from_str(value, "%H:%M") {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("birth_time_format")),
    }
}

/// Half-open date range `[start, end)` covered by one solar cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CyclePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CyclePeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// The four-digit year of the cycle start.
    pub fn label(&self) -> String {
        format!("{:04}", self.start.year())
    }
}

/// A calendar event as computed by the chart provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AstrologicalEvent {
    pub kind: String,
    pub date: NaiveDate,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl AstrologicalEvent {
    /// Human readable title. Not part of the event identity.
    pub fn display_title(&self) -> String {
        if let Some(title) = self.title.as_deref().map(str::trim) {
            if !title.is_empty() {
                return title.to_string();
            }
        }

        let mut parts = vec![self.subject.trim().to_string()];
        if let Some(aspect) = non_empty(&self.aspect_type) {
            parts.push(aspect.to_string());
        }
        match self.kind.trim() {
            "planetary-ingress" => {
                if let Some(sign) = non_empty(&self.sign) {
                    parts.push(format!("enters {sign}"));
                }
            }
            "retrograde-station" => parts.push("stations".to_string()),
            kind => {
                if let Some(sign) = non_empty(&self.sign) {
                    parts.push(format!("in {sign}"));
                }
                parts.push(format!("({})", kind.replace('-', " ")));
            }
        }
        parts.join(" ")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// An event paired with its stable identity inside a stored cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleEvent {
    pub identity: String,
    #[serde(flatten)]
    pub event: AstrologicalEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolarCycle {
    pub owner: String,
    pub cycle_label: String,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    pub events: Vec<CycleEvent>,
    pub created_at: DateTime<Utc>,
}

impl SolarCycle {
    pub fn period(&self) -> CyclePeriod {
        CyclePeriod {
            start: self.cycle_start,
            end: self.cycle_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile() -> BirthProfile {
        BirthProfile {
            birth_date: date(1990, 6, 15),
            birth_time: Some("08:30".to_string()),
            latitude: 52.52,
            longitude: 13.405,
            timezone: "Europe/Berlin".to_string(),
        }
    }

    #[test]
    fn test_birth_profile_validation() {
        assert!(profile().validate().is_ok());

        let mut bad_lat = profile();
        bad_lat.latitude = 91.0;
        assert!(bad_lat.validate().is_err());

        let mut bad_time = profile();
        bad_time.birth_time = Some("25:99".to_string());
        assert!(bad_time.validate().is_err());

        let mut no_time = profile();
        no_time.birth_time = None;
        assert!(no_time.validate().is_ok());

        let mut empty_tz = profile();
        empty_tz.timezone = String::new();
        assert!(empty_tz.validate().is_err());
    }

    #[test]
    fn test_period_is_half_open() {
        let period = CyclePeriod {
            start: date(2025, 6, 15),
            end: date(2026, 6, 15),
        };
        assert!(period.contains(date(2025, 6, 15)));
        assert!(period.contains(date(2026, 6, 14)));
        assert!(!period.contains(date(2026, 6, 15)));
        assert_eq!(period.label(), "2025");
    }

    #[test]
    fn test_display_title_derivation() {
        let ingress = AstrologicalEvent {
            kind: "planetary-ingress".to_string(),
            date: date(2025, 7, 7),
            subject: "Uranus".to_string(),
            sign: Some("Gemini".to_string()),
            aspect_type: None,
            title: None,
        };
        assert_eq!(ingress.display_title(), "Uranus enters Gemini");

        let aspect = AstrologicalEvent {
            kind: "aspect".to_string(),
            date: date(2025, 8, 1),
            subject: "Sun-Saturn".to_string(),
            sign: None,
            aspect_type: Some("square".to_string()),
            title: None,
        };
        assert_eq!(aspect.display_title(), "Sun-Saturn square (aspect)");

        let titled = AstrologicalEvent {
            title: Some("  Full Moon in Pisces ".to_string()),
            ..aspect
        };
        assert_eq!(titled.display_title(), "Full Moon in Pisces");
    }

    #[test]
    fn test_cycle_event_serializes_flat() {
        let event = CycleEvent {
            identity: "kind=6:aspect".to_string(),
            event: AstrologicalEvent {
                kind: "aspect".to_string(),
                date: date(2025, 8, 1),
                subject: "Sun".to_string(),
                sign: None,
                aspect_type: Some("trine".to_string()),
                title: None,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["identity"], "kind=6:aspect");
        assert_eq!(json["aspectType"], "trine");
        assert!(json.get("sign").is_none());
    }
}
