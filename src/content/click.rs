//! Click-target rewriting.
//!
//! A bare phone number as the click target becomes a `tel:` or `sms:` URI
//! when the message text asks for a call or a text, so the printed QR code
//! opens the dialer or the messaging app.

/// Keyword sets and country code used to rewrite phone numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickRules {
    /// Dialing prefix without the leading `+`
    pub country_code: String,
    pub call_keywords: Vec<String>,
    pub text_keywords: Vec<String>,
}

impl Default for ClickRules {
    fn default() -> Self {
        Self {
            country_code: "1".to_string(),
            call_keywords: ["call", "phone", "dial"].map(String::from).to_vec(),
            text_keywords: ["text", "sms", "message"].map(String::from).to_vec(),
        }
    }
}

/// Rewrite an all-digit click target based on keywords in `text`.
///
/// Call keywords are checked before text keywords. Anything that is not a
/// plain run of digits is returned unchanged.
pub fn transform_click_target(token: &str, text: &str, rules: &ClickRules) -> String {
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return token.to_string();
    }

    let lowered = text.to_lowercase();
    let mentions = |keywords: &[String]| {
        keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
    };

    if mentions(&rules.call_keywords) {
        format!("tel:+{}{}", rules.country_code, token)
    } else if mentions(&rules.text_keywords) {
        format!("sms:+{}{}", rules.country_code, token)
    } else {
        token.to_string()
    }
}
