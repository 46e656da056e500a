//! Text normalisation and sanitisation for prompts, shares and previews.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use stillwater_common::StillwaterError;
use stillwater_common::constants::{MAX_MESSAGE_BYTES, MAX_MESSAGE_CHARS};

/// Prompt-injection markers removed from chat messages
static INJECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)ignore\s{1,5}previous\s{1,5}instructions",
        r"(?i)system\s{0,3}:",
        r"(?i)assistant\s{0,3}:",
        r"(?i)\[/?INST\]",
        r"<\|[^|]{0,50}\|>",
        r"(?i)###\s{0,3}(instruction|system|prompt)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("injection pattern is valid"))
    .collect()
});

/// Script-capable URL schemes
static DANGEROUS_SCHEMES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(javascript|data|vbscript):").expect("scheme pattern is valid"));

/// NFKC normalisation
pub fn normalize(text: &str) -> String {
    text.nfkc().collect()
}

/// Zero-width, bidi control, separator, word joiner and BOM characters
pub fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}' | '\u{2028}'..='\u{202F}' | '\u{205F}'..='\u{206F}' | '\u{FEFF}'
    )
}

pub fn strip_invisible(text: &str) -> String {
    text.chars().filter(|c| !is_invisible(*c)).collect()
}

/// Validate and clean a chat message before it is wrapped in a persona prompt
pub fn sanitize_prompt(message: &str) -> Result<String, StillwaterError> {
    let normalized = normalize(message);

    if normalized.chars().count() > MAX_MESSAGE_CHARS {
        return Err(StillwaterError::Validation(format!(
            "Message too long (maximum {MAX_MESSAGE_CHARS} characters)"
        )));
    }
    if normalized.len() > MAX_MESSAGE_BYTES {
        return Err(StillwaterError::Validation("Message too large".to_string()));
    }

    let visible = strip_invisible(&normalized);
    if visible.trim().is_empty() {
        return Err(StillwaterError::Validation(
            "Message cannot be empty or contain only invisible characters".to_string(),
        ));
    }

    let cleaned = INJECTION_PATTERNS
        .iter()
        .fold(visible, |text, re| re.replace_all(&text, "").into_owned());

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(StillwaterError::Validation(
            "Message is empty after sanitization".to_string(),
        ));
    }

    Ok(cleaned.to_string())
}

/// Entity-encode the five HTML-significant characters
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip control characters and script URL schemes, then entity-encode
pub fn sanitize_html(text: &str) -> String {
    let mut cleaned: String = text
        .chars()
        .filter(|c| !is_stripped_control(*c))
        .collect();

    // Removing one scheme can splice another together ("javajavascript:script:")
    while DANGEROUS_SCHEMES.is_match(&cleaned) {
        cleaned = DANGEROUS_SCHEMES.replace_all(&cleaned, "").into_owned();
    }

    escape_html(&cleaned)
}

/// C0 controls except tab, newline and carriage return, plus DEL
fn is_stripped_control(c: char) -> bool {
    matches!(c, '\x00'..='\x08' | '\x0B' | '\x0C' | '\x0E'..='\x1F' | '\x7F')
}

/// Shannon entropy in bits per character
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum()
}
