//! Priority vocabularies.
//!
//! Two scales coexist and are never converted into each other:
//!
//! | Scale | Source | Levels |
//! |-------|--------|--------|
//! | [`Priority`] | ntfy envelope (1–5) | Max, High, Default, Low, Min |
//! | [`AlertLevel`] | structured payloads | Critical, High, Medium, Low |

use serde_json::{Map, Value};

/// Five-level notification priority (ntfy scale, 5 = max).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    Max,
    High,
    #[default]
    Default,
    Low,
    Min,
}

impl Priority {
    /// Map a numeric ntfy priority. Out-of-range values saturate.
    pub fn from_level(level: i64) -> Self {
        match level {
            l if l >= 5 => Self::Max,
            4 => Self::High,
            3 => Self::Default,
            2 => Self::Low,
            _ => Self::Min,
        }
    }

    /// Map a string synonym (case-insensitive).
    pub fn from_synonym(word: &str) -> Option<Self> {
        match word.trim().to_lowercase().as_str() {
            "5" | "urgent" | "critical" | "max" | "emergency" => Some(Self::Max),
            "4" | "high" => Some(Self::High),
            "3" | "normal" | "default" | "medium" => Some(Self::Default),
            "2" | "low" => Some(Self::Low),
            "1" | "min" | "minimal" => Some(Self::Min),
            _ => None,
        }
    }

    /// Header glyph and how many times it repeats.
    pub fn glyph(self) -> (char, usize) {
        match self {
            Self::Max => ('⚡', 3),
            Self::High => ('⚡', 2),
            Self::Default => ('⚡', 1),
            Self::Low => ('↓', 1),
            Self::Min => ('•', 1),
        }
    }

    /// The repeated glyph as printed in a plain-text header.
    pub fn header(self) -> String {
        let (glyph, count) = self.glyph();
        std::iter::repeat_n(glyph, count).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::High => "high",
            Self::Default => "default",
            Self::Low => "low",
            Self::Min => "min",
        }
    }
}

/// Classify a message payload into a [`Priority`].
///
/// A numeric `priority` (number or numeric string) wins. Otherwise the first
/// string found in `priority_str`, `priority_level` or a non-numeric
/// `priority` is looked up as a synonym. Anything else is `Default`.
pub fn classify_priority(payload: Option<&Map<String, Value>>) -> Priority {
    let Some(payload) = payload else {
        return Priority::Default;
    };

    let raw = payload.get("priority");
    if let Some(level) = raw.and_then(numeric_level) {
        return Priority::from_level(level);
    }

    ["priority_str", "priority_level"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .chain(raw)
        .filter_map(Value::as_str)
        .find(|word| !word.trim().is_empty())
        .and_then(Priority::from_synonym)
        .unwrap_or_default()
}

fn numeric_level(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Four-level severity used by task cards and alert banners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl AlertLevel {
    /// Parse a level word; unknown words yield `None`.
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim().to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Parse a level word, falling back to `Medium`.
    pub fn parse_or_medium(word: &str) -> Self {
        Self::parse(word).unwrap_or(Self::Medium)
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Critical => "[!!!]",
            Self::High => "[!!]",
            Self::Medium => "[!]",
            Self::Low => "[-]",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}
