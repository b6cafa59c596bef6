use serde_json::{json, Value};

use crate::models::AstrologicalEvent;

/// Deterministic stand-in content used when the provider fails.
///
/// Depends only on the event, so every fallback for the same event is
/// identical and carries no provider text.
pub fn fallback_content(event: &AstrologicalEvent) -> Value {
    let subject = event.subject.trim();
    let (strength, blockage, mantra, exercise) = match event.kind.trim().to_lowercase().as_str() {
        "lunar-phase" => (
            "A natural checkpoint for noticing what has grown since the last lunation.".to_string(),
            "Emotions may run ahead of the facts.",
            "I honour the rhythm I am in.",
            "Name one thing to begin and one thing to release.",
        ),
        "retrograde-station" => (
            format!("{subject} turns attention back to unfinished business."),
            "Plans made in haste may need revisiting.",
            "I review before I move.",
            "Revisit one open loop and close it.",
        ),
        "planetary-ingress" => (
            format!("{subject} changes tone and opens a new chapter."),
            "Old habits may resist the shift.",
            "I welcome the new weather.",
            "Note how the mood of the day differs from last week.",
        ),
        "eclipse" => (
            "A strong marker for turning points and sudden clarity.".to_string(),
            "Pressure to decide before you are ready.",
            "I trust what is being revealed.",
            "Write down what feels like it is ending and what is beginning.",
        ),
        "aspect" => (
            format!("{subject}: their themes meet and ask to be integrated."),
            "Competing needs may pull in different directions.",
            "I hold both sides with patience.",
            "Spend ten minutes on whichever side you have neglected.",
        ),
        _ => (
            "A meaningful moment in your year.".to_string(),
            "Distraction may blur its message.",
            "I stay present.",
            "Pause for five quiet minutes and notice what comes up.",
        ),
    };

    json!({
        "title": event.display_title(),
        "strength": strength,
        "blockage": blockage,
        "mantra": mantra,
        "exercise": exercise,
    })
}
