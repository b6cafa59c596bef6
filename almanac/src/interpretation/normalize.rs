use serde_json::Value;

use super::content::{field_text, KNOWN_FIELDS};

/// The historical payload shape an entry was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    /// title/strength/blockage/mantra/exercise
    Structured,
    /// synthesis/opportunity/challenge/affirmation/...
    Legacy,
    /// summary/description/text/content only
    Generic,
    /// An object with none of the known fields.
    Freeform,
    /// A bare JSON string.
    Text,
    Empty,
}

const STRUCTURED_KEYS: &[&str] = &["title", "headline", "strength", "blockage", "mantra", "exercise"];
const LEGACY_KEYS: &[&str] = &[
    "synthesis",
    "interpretation",
    "opportunity",
    "challenge",
    "affirmation",
    "practice",
    "advice",
];
const GENERIC_KEYS: &[&str] = &["summary", "description", "text", "content"];

pub fn detect_shape(content: &Value) -> ContentShape {
    match content {
        Value::String(s) if !s.trim().is_empty() => ContentShape::Text,
        Value::Object(map) => {
            let has_any = |keys: &[&str]| keys.iter().any(|k| map.get(*k).and_then(field_text).is_some());
            if has_any(STRUCTURED_KEYS) {
                ContentShape::Structured
            } else if has_any(LEGACY_KEYS) {
                ContentShape::Legacy
            } else if has_any(GENERIC_KEYS) {
                ContentShape::Generic
            } else if map.is_empty() {
                ContentShape::Empty
            } else {
                ContentShape::Freeform
            }
        }
        _ => ContentShape::Empty,
    }
}

/// Render any stored payload as plain description text.
///
/// Known fields are emitted in priority order, one per line, labelled where
/// the field has a label. Payloads without known fields fall back to their
/// top-level strings in key order, then to the compact JSON itself. Returns an
/// empty string only for empty payloads.
pub fn normalize_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => {
            let mut lines: Vec<String> = Vec::new();
            for known in KNOWN_FIELDS {
                let Some(text) = map.get(known.key).and_then(field_text) else {
                    continue;
                };
                let line = match known.label {
                    Some(label) => format!("{label}: {text}"),
                    None => text,
                };
                if !lines.contains(&line) {
                    lines.push(line);
                }
            }

            if lines.is_empty() {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                lines = entries
                    .into_iter()
                    .filter_map(|(_, v)| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }

            if lines.is_empty() && !map.is_empty() {
                return content.to_string();
            }

            lines.join("\n")
        }
        Value::Null => String::new(),
        other => field_text(other).unwrap_or_else(|| other.to_string()),
    }
}

/// Headline carried by the payload, if any.
pub fn content_title(content: &Value) -> Option<String> {
    let map = content.as_object()?;
    ["title", "headline"]
        .iter()
        .find_map(|key| map.get(*key).and_then(field_text))
}
