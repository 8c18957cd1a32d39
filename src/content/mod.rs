//! # Content Normalization
//!
//! Turns an inbound message and its metadata into a [`NormalizedMessage`]:
//! printable text, a classified priority, translated tags, a click target,
//! and structured task or alert fields when the payload carries them.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`priority`] | 5-level ntfy priority and 4-level alert vocabulary |
//! | [`emoji`] | Emoji replacement and ntfy tag labels |
//! | [`click`] | Phone-number click targets to `tel:`/`sms:` URIs |
//!
//! Every text field is truncated to the configured cap here, before any
//! layout work sees it.

pub mod click;
pub mod emoji;
pub mod priority;

pub use click::{ClickRules, transform_click_target};
pub use emoji::{sanitize_text, translate_tag};
pub use priority::{AlertLevel, Priority, classify_priority};

use serde_json::{Map, Value};

/// Marker appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Longest task name printed on a card
const TASK_NAME_CHARS: usize = 50;

/// Text volume limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Character cap applied to every text field
    pub max_message_len: usize,
    /// Optional body line cap; `None` wraps to completion
    pub max_lines: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_message_len: 300,
            max_lines: None,
        }
    }
}

/// Truncate to `cap` characters, ending in `...` when anything was cut.
///
/// Caps too small to hold the ellipsis keep only the first `cap` characters.
pub fn truncate(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }
    if cap <= ELLIPSIS.len() {
        return text.chars().take(cap).collect();
    }
    let mut out: String = text.chars().take(cap - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Cut the raw text to `cap`, then sanitize.
///
/// Cutting first means a message over the cap prints exactly like the same
/// message already cut to the cap, even when the cut splits an emoji.
pub fn clean_text(text: &str, cap: usize) -> String {
    truncate(&sanitize_text(&truncate(text, cap)), cap)
}

/// Task card fields extracted from a `monday_task` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub name: String,
    /// Lowercased status word (`todo`, `in_progress`, ...)
    pub status: String,
    /// `None` when the payload used a word outside the 4-level vocabulary
    pub level: Option<AlertLevel>,
    /// Upper-cased initials, at most 3 characters
    pub assignee: String,
    pub due_date: String,
    pub reference: String,
    pub qr_target: Option<String>,
}

impl TaskFields {
    pub fn status_icon(&self) -> &'static str {
        match self.status.as_str() {
            "done" | "completed" => "[OK]",
            "in_progress" | "wip" => "[WIP]",
            "todo" => "[TODO]",
            "blocked" => "[BLOCKED]",
            "on_hold" => "[HOLD]",
            _ => "[?]",
        }
    }

    pub fn priority_icon(&self) -> &'static str {
        self.level.map(AlertLevel::icon).unwrap_or("[!]")
    }
}

/// A message ready for layout. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub text: String,
    pub title: Option<String>,
    pub subtext: Option<String>,
    pub priority: Priority,
    /// Tag labels, already translated
    pub tags: Vec<String>,
    pub click: Option<String>,
    pub task: Option<TaskFields>,
    pub alert: Option<AlertLevel>,
}

impl NormalizedMessage {
    /// Build a plain-text message from its body and transport metadata.
    pub fn plain(
        text: &str,
        subtext: Option<&str>,
        metadata: Option<&Map<String, Value>>,
        limits: &Limits,
        rules: &ClickRules,
    ) -> Self {
        let cap = limits.max_message_len;
        let text = clean_text(text, cap);

        let title = metadata
            .and_then(|m| str_field(m, "title"))
            .map(|t| clean_text(&t, cap));

        let tags = metadata.map(tag_labels).unwrap_or_default();

        let click = metadata
            .and_then(|m| str_field(m, "click"))
            .map(|target| transform_click_target(&target, &text, rules));

        Self {
            title,
            subtext: subtext
                .filter(|s| !s.trim().is_empty())
                .map(|s| clean_text(s, cap)),
            priority: classify_priority(metadata),
            tags,
            click,
            task: None,
            alert: None,
            text,
        }
    }

    /// Build a task card message from a `monday_task` payload.
    pub fn task(payload: &Map<String, Value>, limits: &Limits) -> Self {
        let name = str_field(payload, "task").unwrap_or_else(|| "Task".to_string());
        let name: String = sanitize_text(name.trim()).chars().take(TASK_NAME_CHARS).collect();

        let level_word = str_field(payload, "priority").unwrap_or_else(|| "medium".to_string());
        let status = str_field(payload, "status")
            .unwrap_or_else(|| "todo".to_string())
            .to_lowercase();

        let fields = TaskFields {
            name: truncate(&name, limits.max_message_len),
            status,
            level: AlertLevel::parse(&level_word),
            assignee: str_field(payload, "assignee")
                .unwrap_or_default()
                .to_uppercase()
                .chars()
                .take(3)
                .collect(),
            due_date: str_field(payload, "due_date")
                .unwrap_or_default()
                .chars()
                .take(10)
                .collect(),
            reference: str_field(payload, "id")
                .or_else(|| str_field(payload, "ref_id"))
                .unwrap_or_default(),
            qr_target: str_field(payload, "qr_url").or_else(|| str_field(payload, "url")),
        };

        Self {
            text: fields.name.clone(),
            title: None,
            subtext: None,
            priority: Priority::Default,
            tags: Vec::new(),
            click: None,
            task: Some(fields),
            alert: None,
        }
    }

    /// Build a banner alert from a `priority_alert` payload.
    pub fn alert(payload: &Map<String, Value>, limits: &Limits) -> Self {
        let cap = limits.max_message_len;
        let level = str_field(payload, "priority")
            .map(|w| AlertLevel::parse_or_medium(&w))
            .unwrap_or(AlertLevel::Medium);
        let text = str_field(payload, "message").unwrap_or_else(|| "Alert".to_string());

        Self {
            text: clean_text(&text, cap),
            title: None,
            subtext: str_field(payload, "subtext").map(|s| clean_text(&s, cap)),
            priority: Priority::Default,
            tags: Vec::new(),
            click: None,
            task: None,
            alert: Some(level),
        }
    }
}

/// Read a non-empty string field; numbers are rendered as text.
pub(crate) fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Tags arrive either as a JSON list or a comma-separated string.
fn tag_labels(metadata: &Map<String, Value>) -> Vec<String> {
    let raw: Vec<String> = match metadata.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };

    raw.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(translate_tag)
        .filter(|t| !t.trim().is_empty())
        .collect()
}
