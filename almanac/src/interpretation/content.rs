use serde_json::Value;

use crate::error::{AlmanacError, Result};

/// A narrative field the normalizer knows how to render.
#[derive(Debug, Clone, Copy)]
pub struct KnownField {
    pub key: &'static str,
    pub label: Option<&'static str>,
}

const fn field(key: &'static str, label: Option<&'static str>) -> KnownField {
    KnownField { key, label }
}

/// Every content field ever written, newest schema first.
pub const KNOWN_FIELDS: &[KnownField] = &[
    // current schema
    field("title", None),
    field("headline", None),
    field("strength", Some("Strength")),
    field("blockage", Some("Blockage")),
    field("mantra", Some("Mantra")),
    field("exercise", Some("Exercise")),
    // older schema
    field("synthesis", None),
    field("interpretation", None),
    field("opportunity", Some("Opportunity")),
    field("challenge", Some("Challenge")),
    field("affirmation", Some("Affirmation")),
    field("practice", Some("Practice")),
    field("advice", Some("Advice")),
    // generic
    field("summary", None),
    field("description", None),
    field("text", None),
    field("content", None),
];

/// Text carried by a content field: a string, a `{ "text": ... }` object, or
/// an array of strings. Blank values count as absent.
pub fn field_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => return map.get("text").and_then(field_text),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };

    (!text.is_empty()).then_some(text)
}

/// Parse raw provider text into a content payload, accepting a fenced block.
pub fn parse_generated(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(crate::llm::strip_code_fence(raw)).map_err(|e| {
        AlmanacError::ProviderMalformedOutput(format!("Provider output is not JSON: {e}"))
    })?;
    validate_generated(value)
}

/// Accept a provider payload only if it is an object carrying at least one
/// known narrative field with text.
pub fn validate_generated(value: Value) -> Result<Value> {
    let Some(map) = value.as_object() else {
        return Err(AlmanacError::ProviderMalformedOutput(
            "Provider output is not a JSON object".to_string(),
        ));
    };

    let has_narrative = KNOWN_FIELDS
        .iter()
        .any(|known| map.get(known.key).and_then(field_text).is_some());

    if !has_narrative {
        return Err(AlmanacError::ProviderMalformedOutput(
            "Provider output has no narrative fields".to_string(),
        ));
    }

    Ok(value)
}
