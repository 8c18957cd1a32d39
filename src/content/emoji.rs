//! Emoji handling for thermal printing.
//!
//! Receipt fonts have no color glyphs, so known emoji become short ASCII tags
//! and everything else in the pictographic blocks is dropped.

/// Known emoji and their printable replacement.
///
/// Multi-codepoint entries (with U+FE0F) are listed before anything that
/// could match a prefix of them.
pub const EMOJI_MAP: &[(&str, &str)] = &[
    ("🍕", "[pizza]"),
    ("🍔", "[burger]"),
    ("🍆", "[eggplant]"),
    ("☕", "[coffee]"),
    ("🎉", "[party]"),
    ("✅", "[check]"),
    ("❌", "[x]"),
    ("⚠️", "[warn]"),
    ("🔔", "[bell]"),
    ("📅", "[cal]"),
    ("⏰", "[clock]"),
    ("👍", "[+1]"),
    ("👎", "[-1]"),
    ("❤️", "[heart]"),
    ("🔥", "[fire]"),
    ("💡", "[idea]"),
    ("📧", "[mail]"),
    ("📱", "[phone]"),
    ("🚨", "[alert]"),
    ("✨", "[*]"),
    ("⚡", "[!]"),
];

/// ntfy tag short-codes and the label printed in the header.
const TAG_MAP: &[(&str, &str)] = &[
    ("warning", "[warn]"),
    ("rotating_light", "[alert]"),
    ("white_check_mark", "[check]"),
    ("heavy_check_mark", "[check]"),
    ("x", "[x]"),
    ("tada", "[party]"),
    ("bell", "[bell]"),
    ("calendar", "[cal]"),
    ("alarm_clock", "[clock]"),
    ("+1", "[+1]"),
    ("thumbsup", "[+1]"),
    ("-1", "[-1]"),
    ("thumbsdown", "[-1]"),
    ("heart", "[heart]"),
    ("fire", "[fire]"),
    ("bulb", "[idea]"),
    ("email", "[mail]"),
    ("envelope", "[mail]"),
    ("iphone", "[phone]"),
    ("pizza", "[pizza]"),
    ("hamburger", "[burger]"),
    ("eggplant", "[eggplant]"),
    ("coffee", "[coffee]"),
    ("sparkles", "[*]"),
    ("zap", "[!]"),
];

/// Codepoint ranges removed after the known replacements.
const STRIP_RANGES: &[(u32, u32)] = &[
    (0x1F600, 0x1F64F), // emoticons
    (0x1F300, 0x1F5FF), // symbols & pictographs
    (0x1F680, 0x1F6FF), // transport & map
    (0x1F1E0, 0x1F1FF), // flags
    (0x2702, 0x27B0),   // dingbats
    (0x24C2, 0x1F251),  // enclosed characters and everything between
    (0x1F900, 0x1F9FF), // supplemental symbols
    (0x1FA00, 0x1FA6F), // extended symbols
];

fn is_stripped(ch: char) -> bool {
    let cp = ch as u32;
    STRIP_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

/// Replace known emoji with ASCII tags and drop the remaining pictographs.
///
/// Idempotent: the output contains no character from the stripped ranges,
/// and every replacement key is made of such characters.
pub fn sanitize_text(text: &str) -> String {
    let mut out = text.to_string();
    for (emoji, replacement) in EMOJI_MAP {
        if out.contains(emoji) {
            out = out.replace(emoji, replacement);
        }
    }
    out.chars().filter(|&ch| !is_stripped(ch)).collect()
}

/// Translate an ntfy tag to its printable label; unknown tags pass through.
pub fn translate_tag(tag: &str) -> String {
    TAG_MAP
        .iter()
        .find(|(code, _)| *code == tag)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| sanitize_text(tag))
}
