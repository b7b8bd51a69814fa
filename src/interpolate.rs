//! `{OTHER_KEY}` placeholder expansion in string values.
//!
//! Only placeholders of uppercase key characters are recognized; anything
//! else (lowercase, spaces, empty braces) is literal text. The lookup
//! callback is fallible so cycle detection and unknown-key errors can
//! surface from the middle of an expansion.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SettingsError;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([0-9A-Z_.]+)\}").unwrap());

/// Expand every placeholder in `text` via `lookup`, which receives the key
/// between the braces and returns its replacement text.
pub fn expand<F>(text: &str, mut lookup: F) -> Result<String, SettingsError>
where
    F: FnMut(&str) -> Result<String, SettingsError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(text) {
        let whole = caps.get(0).ok_or_else(|| SettingsError::InvalidValue {
            key: String::new(),
            reason: "placeholder match without capture".into(),
        })?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(&lookup(&caps[1])?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Whether `text` contains at least one placeholder.
pub fn has_placeholder(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}
