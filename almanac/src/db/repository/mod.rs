mod cycles;
mod interpretations;

pub use cycles::CycleRepository;
pub use interpretations::InterpretationRepository;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::{AlmanacError, Result};

/// Fixed-width UTC timestamp, so lexical order in SQL is chronological.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AlmanacError::Internal(format!("Invalid stored timestamp '{value}': {e}")))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AlmanacError::Internal(format!("Invalid stored date '{value}': {e}")))
}
