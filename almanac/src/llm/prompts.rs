//! Prompt templates for interpretation generation
//!
//! Templates use plain `format!()` interpolation. The expected response shape
//! is the current content schema understood by the normalizer.

use crate::models::{AstrologicalEvent, GenerationContext};

/// System prompt shared by every interpretation request.
pub const INTERPRETATION_SYSTEM_PROMPT: &str = "You are a thoughtful astrologer writing short, \
practical interpretations of personal calendar events. You answer with a single JSON object \
and nothing else.";

/// Build the user prompt for one calendar event.
///
/// # Example
/// ```
/// use almanac::llm::prompts::interpretation_prompt;
/// use almanac::models::{AstrologicalEvent, GenerationContext};
/// use chrono::NaiveDate;
///
/// let event = AstrologicalEvent {
///     kind: "lunar-phase".to_string(),
///     date: NaiveDate::from_ymd_opt(2025, 9, 7).unwrap(),
///     subject: "Moon".to_string(),
///     sign: Some("Pisces".to_string()),
///     aspect_type: None,
///     title: Some("Full Moon in Pisces".to_string()),
/// };
/// let prompt = interpretation_prompt(&event, &GenerationContext::default());
/// assert!(prompt.contains("Full Moon in Pisces"));
/// ```
pub fn interpretation_prompt(event: &AstrologicalEvent, context: &GenerationContext) -> String {
    let mut details = vec![
        format!("Event: {}", event.display_title()),
        format!("Type: {}", event.kind.trim()),
        format!("Date: {}", event.date.format("%Y-%m-%d")),
        format!("Subject: {}", event.subject.trim()),
    ];
    if let Some(sign) = event.sign.as_deref().filter(|s| !s.trim().is_empty()) {
        details.push(format!("Sign: {}", sign.trim()));
    }
    if let Some(aspect) = event.aspect_type.as_deref().filter(|s| !s.trim().is_empty()) {
        details.push(format!("Aspect: {}", aspect.trim()));
    }

    let person = context
        .display_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .map(|n| format!("The reader's name is {}.\n", n.trim()))
        .unwrap_or_default();
    let chart = context
        .chart_summary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("Natal chart summary:\n{}\n", s.trim()))
        .unwrap_or_default();
    let language = context
        .language
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or("English");

    format!(
        r#"Write a personal interpretation of this astrological event for the reader's year ahead.
{person}{chart}
{details}

Write in {language}. Respond with valid JSON only, using exactly these fields:
{{
  "title": "a short evocative headline",
  "strength": "what this event supports, 1-2 sentences",
  "blockage": "what may get in the way, 1-2 sentences",
  "mantra": "a one-line affirmation",
  "exercise": "one concrete thing to do that day",
  "synthesis": "a 2-3 sentence overall reading"
}}"#,
        details = details.join("\n")
    )
}
