//! iCalendar export of a solar cycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use icalendar::{Alarm, Calendar, Component, EventLike, Property, Trigger, ValueType};
use url::Url;

use crate::clock::Clock;
use crate::config::CalendarConfig;
use crate::cycle::calendar_uid;
use crate::db::DatabaseBackend;
use crate::error::{AlmanacError, Result};
use crate::interpretation::normalize_content;
use crate::models::{CycleEvent, InterpretationEntry, SolarCycle};
use crate::services::CycleService;

pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
pub const PRODID: &str = "-//Almanac//Solar Return Calendar//EN";
pub const MISSING_DESCRIPTION: &str = "Your interpretation for this event is still being written.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Reads a stored cycle and its cached interpretations and renders them as
/// one VCALENDAR.
#[derive(Clone)]
pub struct CalendarExporter {
    db: Arc<dyn DatabaseBackend>,
    cycles: CycleService,
    clock: Arc<dyn Clock>,
    config: CalendarConfig,
}

impl CalendarExporter {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        cycles: CycleService,
        clock: Arc<dyn Clock>,
        config: CalendarConfig,
    ) -> Self {
        Self {
            db,
            cycles,
            clock,
            config,
        }
    }

    /// Export never fails because of missing interpretations; events without
    /// a live entry get a placeholder description.
    pub async fn export(&self, owner: &str, cycle_label: &str) -> Result<CalendarDocument> {
        let cycle = self.cycles.get_cycle(owner, cycle_label).await?;
        let entries: HashMap<String, InterpretationEntry> = self
            .db
            .list_interpretations(owner, cycle.cycle_start, cycle.cycle_end, self.clock.now())
            .await?
            .into_iter()
            .map(|entry| (entry.event_identity.clone(), entry))
            .collect();

        let ics = render_calendar(&cycle, &entries, &self.config)?;
        tracing::debug!(
            owner = %owner,
            cycle = %cycle_label,
            events = cycle.events.len(),
            cached = entries.len(),
            bytes = ics.len(),
            "Calendar exported"
        );

        Ok(CalendarDocument {
            bytes: ics.into_bytes(),
            content_type: CALENDAR_CONTENT_TYPE,
            filename: format!("{}-{}.ics", sanitize_filename(owner), sanitize_filename(cycle_label)),
        })
    }
}

/// Render a cycle as iCalendar text. Pure: the same inputs always give the
/// same bytes.
pub fn render_calendar(
    cycle: &SolarCycle,
    entries: &HashMap<String, InterpretationEntry>,
    config: &CalendarConfig,
) -> Result<String> {
    let mut events: Vec<&CycleEvent> = cycle.events.iter().collect();
    events.sort_by(|a, b| {
        a.event
            .date
            .cmp(&b.event.date)
            .then_with(|| a.identity.cmp(&b.identity))
    });

    // icalendar escapes X-WR-CALNAME but writes NAME verbatim.
    let mut cal = Calendar::new();
    cal.append_property(Property::new("NAME", escape_text(&config.name)));
    cal.append_property(Property::new("X-WR-CALNAME", plain_text(&config.name)));

    for event in events {
        let entry = entries.get(&event.identity);
        cal.push(render_event(cycle, event, entry, config)?);
    }

    Ok(canonicalize(&cal.done().to_string()))
}

fn render_event(
    cycle: &SolarCycle,
    event: &CycleEvent,
    entry: Option<&InterpretationEntry>,
    config: &CalendarConfig,
) -> Result<icalendar::Event> {
    let title = plain_text(&event.event.display_title());
    let description = entry
        .map(|e| normalize_content(&e.content))
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| MISSING_DESCRIPTION.to_string());
    let stamp = entry.map(|e| e.generated_at).unwrap_or(cycle.created_at);

    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&calendar_uid(&cycle.owner, &event.identity, &config.uid_domain));
    ics_event.add_property("DTSTAMP", format_utc(stamp));
    ics_event.append_property(date_property("DTSTART", event.event.date));
    ics_event.append_property(date_property("DTEND", event.event.date));
    ics_event.summary(&title);
    ics_event.description(&plain_text(&description));
    ics_event.add_property(
        "URL",
        deep_link(&config.base_url, &cycle.cycle_label, &event.identity)?.as_str(),
    );

    let alarm = Alarm::display(&title, Trigger::before_start(chrono::Duration::zero()));
    ics_event.alarm(alarm);

    Ok(ics_event.done())
}

fn date_property(name: &str, date: NaiveDate) -> Property {
    let mut prop = Property::new(name, date.format("%Y%m%d").to_string());
    prop.append_parameter(ValueType::Date);
    prop
}

fn format_utc(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

/// `{base}/cycles/{label}/events/{identity}` with each segment percent-encoded.
fn deep_link(base: &str, cycle_label: &str, identity: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| AlmanacError::Validation(format!("Calendar base URL cannot hold a path: {base}")))?
        .pop_if_empty()
        .extend(["cycles", cycle_label, "events", identity]);
    Ok(url)
}

/// Text handed to icalendar for TEXT-typed properties, which it escapes on
/// output. Only line endings are unified here.
fn plain_text(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\r', "\n")
}

/// RFC 5545 TEXT escaping for properties icalendar writes verbatim.
/// Newlines become the two characters `\n`.
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in plain_text(value).chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' | '\r' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Make the library output stable: fixed PRODID, no default CALSCALE, and no
/// generated DTSTAMP/UID on alarms.
fn canonicalize(ics: &str) -> String {
    let mut open: Vec<&str> = Vec::new();
    let mut out = String::with_capacity(ics.len());

    for line in ics.lines() {
        if let Some(component) = line.strip_prefix("BEGIN:") {
            open.push(component);
        }

        let keep = match property_name(line) {
            "CALSCALE" => line != "CALSCALE:GREGORIAN",
            "DTSTAMP" | "UID" => open.last() != Some(&"VALARM"),
            _ => true,
        };

        if line.starts_with("END:") {
            open.pop();
        }
        if !keep {
            continue;
        }

        if property_name(line) == "PRODID" {
            out.push_str("PRODID:");
            out.push_str(PRODID);
        } else {
            out.push_str(line);
        }
        out.push_str("\r\n");
    }

    out
}

/// Name of the property on a content line. Folded continuation lines start
/// with a space and never match a property name.
fn property_name(line: &str) -> &str {
    line.split([':', ';']).next().unwrap_or(line)
}

fn sanitize_filename(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "calendar".to_string()
    } else {
        cleaned
    }
}
