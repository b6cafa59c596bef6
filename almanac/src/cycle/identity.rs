use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::models::{AstrologicalEvent, CycleEvent};

/// Deterministic identity of an event within an owner's calendar.
///
/// Fields are emitted in a fixed order as `<tag>=<byte length>:<value>`,
/// trimmed and lower-cased, joined with `;`. Absent optional fields are left
/// out entirely. The length prefix keeps values containing `;` or `=` from
/// colliding with a different split of fields.
pub fn event_identity(event: &AstrologicalEvent) -> String {
    let date = event.date.format("%Y-%m-%d").to_string();
    let fields: [(&str, Option<&str>); 5] = [
        ("kind", Some(event.kind.as_str())),
        ("date", Some(date.as_str())),
        ("subject", Some(event.subject.as_str())),
        ("sign", event.sign.as_deref()),
        ("aspect", event.aspect_type.as_deref()),
    ];

    let mut segments = Vec::with_capacity(fields.len());
    for (tag, value) in fields {
        let Some(value) = value else { continue };
        let value = value.trim().to_lowercase();
        if value.is_empty() && tag != "kind" && tag != "subject" {
            continue;
        }
        segments.push(format!("{tag}={}:{value}", value.len()));
    }

    segments.join(";")
}

/// Globally unique, stable calendar UID for an owner's event.
pub fn calendar_uid(owner: &str, identity: &str, domain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner.as_bytes());
    hasher.update([0u8]);
    hasher.update(identity.as_bytes());
    format!("{:x}@{domain}", hasher.finalize())
}

/// Pair each event with its identity, dropping semantic duplicates (first
/// occurrence wins) and ordering by `(date, identity)`.
pub fn assign_identities(events: Vec<AstrologicalEvent>) -> Vec<CycleEvent> {
    let mut unique: BTreeMap<(chrono::NaiveDate, String), CycleEvent> = BTreeMap::new();

    for event in events {
        let identity = event_identity(&event);
        unique
            .entry((event.date, identity.clone()))
            .or_insert(CycleEvent { identity, event });
    }

    unique.into_values().collect()
}
