//! Message dispatch.
//!
//! Decides which layout a message gets. A message body that parses as a JSON
//! object with a `type` field is structured; everything else is plain text.
//!
//! | Body | Variant |
//! |------|---------|
//! | `{"type": "monday_task", ...}` | [`RenderVariant::StructuredTask`] |
//! | `{"type": "priority_alert", ...}` | [`RenderVariant::PriorityAlert`] |
//! | `{"type": "text_with_subtext", ...}` | [`RenderVariant::TextWithSubtext`] |
//! | `{"type": <anything else>, ...}` | [`RenderVariant::GenericFallback`] |
//! | anything else | [`RenderVariant::PlainText`] |

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use super::alert::render_alert;
use super::canvas::Canvas;
use super::plain::PlainLayout;
use super::task::TaskCard;
use super::RenderContext;
use crate::content::{NormalizedMessage, str_field};

/// Result of parsing an inbound message body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    /// A JSON object carrying a `type` discriminator
    Structured(Map<String, Value>),
    /// Free text. A JSON object without `type` keeps its fields so they can
    /// stand in for missing transport metadata.
    PlainText { embedded: Option<Map<String, Value>> },
}

pub fn parse_message(raw: &str) -> ParsedMessage {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) if map.contains_key("type") => ParsedMessage::Structured(map),
        Ok(Value::Object(map)) => ParsedMessage::PlainText {
            embedded: Some(map),
        },
        _ => ParsedMessage::PlainText { embedded: None },
    }
}

/// Layout variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderVariant {
    PlainText,
    StructuredTask,
    PriorityAlert,
    TextWithSubtext,
    GenericFallback,
}

impl RenderVariant {
    /// Variant for a structured payload, keyed by its `type`.
    pub fn for_payload(payload: &Map<String, Value>) -> Self {
        match payload.get("type").and_then(Value::as_str) {
            Some("monday_task") => Self::StructuredTask,
            Some("priority_alert") => Self::PriorityAlert,
            Some("text_with_subtext") => Self::TextWithSubtext,
            _ => Self::GenericFallback,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::StructuredTask => "structured_task",
            Self::PriorityAlert => "priority_alert",
            Self::TextWithSubtext => "text_with_subtext",
            Self::GenericFallback => "generic_fallback",
        }
    }
}

/// A laid-out message ready for printing.
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub variant: RenderVariant,
    pub message: NormalizedMessage,
    pub canvas: Canvas,
}

/// Normalize a message body and metadata into a variant and its message.
pub fn normalize(
    raw: &str,
    metadata: Option<&Map<String, Value>>,
    ctx: &RenderContext,
) -> (RenderVariant, NormalizedMessage) {
    let limits = &ctx.limits;
    match parse_message(raw) {
        ParsedMessage::Structured(payload) => {
            let variant = RenderVariant::for_payload(&payload);
            let message = match variant {
                RenderVariant::StructuredTask => NormalizedMessage::task(&payload, limits),
                RenderVariant::PriorityAlert => NormalizedMessage::alert(&payload, limits),
                RenderVariant::TextWithSubtext => {
                    let text = str_field(&payload, "message").unwrap_or_else(|| "Message".to_string());
                    let subtext = str_field(&payload, "subtext");
                    NormalizedMessage::plain(&text, subtext.as_deref(), None, limits, &ctx.click)
                }
                _ => {
                    let dumped = Value::Object(payload).to_string();
                    NormalizedMessage::plain(&dumped, None, None, limits, &ctx.click)
                }
            };
            (variant, message)
        }
        ParsedMessage::PlainText { embedded } => {
            let metadata = metadata.or(embedded.as_ref());
            let message = NormalizedMessage::plain(raw, None, metadata, limits, &ctx.click);
            (RenderVariant::PlainText, message)
        }
    }
}

/// Lay out a normalized message with the given variant.
pub fn render(
    variant: RenderVariant,
    message: &NormalizedMessage,
    ctx: &RenderContext,
    now: NaiveDateTime,
) -> Canvas {
    match (variant, &message.task, message.alert) {
        (RenderVariant::StructuredTask, Some(task), _) => TaskCard::build(task).render(ctx),
        (RenderVariant::PriorityAlert, _, Some(level)) => {
            render_alert(level, message.subtext.as_deref(), ctx)
        }
        _ => PlainLayout::build(message, ctx.limits.max_lines).render(ctx, now),
    }
}

/// Parse, normalize and lay out one inbound message.
pub fn dispatch(
    raw: &str,
    metadata: Option<&Map<String, Value>>,
    ctx: &RenderContext,
    now: NaiveDateTime,
) -> RenderedMessage {
    let (variant, message) = normalize(raw, metadata, ctx);
    let canvas = render(variant, &message, ctx, now);
    RenderedMessage {
        variant,
        message,
        canvas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ClickRules, Limits, Priority};
    use crate::printer::{Geometry, PaperConfig};
    use crate::render::font::FontSet;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx() -> RenderContext {
        RenderContext {
            geometry: Geometry::resolve(&PaperConfig::default()).unwrap(),
            fonts: FontSet::builtin(),
            limits: Limits::default(),
            click: ClickRules::default(),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_message_variants() {
        assert_eq!(parse_message("hello"), ParsedMessage::PlainText { embedded: None });
        assert_eq!(parse_message("[1, 2]"), ParsedMessage::PlainText { embedded: None });
        assert!(matches!(
            parse_message(r#"{"type": "monday_task"}"#),
            ParsedMessage::Structured(_)
        ));
        assert!(matches!(
            parse_message(r#"{"title": "x"}"#),
            ParsedMessage::PlainText { embedded: Some(_) }
        ));
    }

    #[test]
    fn test_variant_selection() {
        let cases = [
            (r#"{"type": "monday_task", "task": "t"}"#, RenderVariant::StructuredTask),
            (r#"{"type": "priority_alert"}"#, RenderVariant::PriorityAlert),
            (r#"{"type": "text_with_subtext", "message": "m"}"#, RenderVariant::TextWithSubtext),
            (r#"{"type": "mystery"}"#, RenderVariant::GenericFallback),
            ("just words", RenderVariant::PlainText),
        ];
        let ctx = ctx();
        for (raw, expected) in cases {
            let rendered = dispatch(raw, None, &ctx, now());
            assert_eq!(rendered.variant, expected, "body {}", raw);
            assert!(rendered.canvas.height() > 0);
        }
    }

    #[test]
    fn test_generic_fallback_prints_json() {
        let (_, message) = normalize(r#"{"type": "mystery", "n": 1}"#, None, &ctx());
        let reparsed: Value = serde_json::from_str(&message.text).unwrap();
        assert_eq!(reparsed, json!({ "type": "mystery", "n": 1 }));
    }

    #[test]
    fn test_text_with_subtext_fields() {
        let (_, message) = normalize(
            r#"{"type": "text_with_subtext", "message": "Dinner", "subtext": "7pm"}"#,
            None,
            &ctx(),
        );
        assert_eq!(message.text, "Dinner");
        assert_eq!(message.subtext.as_deref(), Some("7pm"));
    }

    #[test]
    fn test_embedded_fields_stand_in_for_metadata() {
        let raw = json!({ "title": "T", "priority": 5 }).to_string();
        let (_, message) = normalize(&raw, None, &ctx());
        assert_eq!(message.priority, Priority::Max);
        assert_eq!(message.title.as_deref(), Some("T"));

        let metadata = json!({ "priority": 2 });
        let (_, message) = normalize(&raw, metadata.as_object(), &ctx());
        assert_eq!(message.priority, Priority::Low);
    }

    #[test]
    fn test_structured_task_name_is_sanitized() {
        let (_, message) = normalize(r#"{"type": "monday_task", "task": "Order 🍕"}"#, None, &ctx());
        assert_eq!(message.task.unwrap().name, "Order [pizza]");
    }
}
