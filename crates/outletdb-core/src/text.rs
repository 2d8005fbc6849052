//! Text cleanup applied to scraped field values.

/// Characters removed from the end of display text.
const TRAILING_PUNCTUATION: &[char] = &[',', '.', ';', ':'];

/// Trims the value and collapses every internal whitespace run (including
/// newlines and non-breaking spaces) to a single ASCII space.
#[must_use]
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-collapsed text with trailing separators removed. Casing is kept.
///
/// Values with no alphanumeric characters at all (e.g. `"???"`) are returned
/// collapsed but otherwise untouched, so they stay non-empty and reach the
/// geocoder as written.
#[must_use]
pub fn clean_display_text(value: &str) -> String {
    let collapsed = collapse_whitespace(value);
    if !collapsed.chars().any(char::is_alphanumeric) {
        return collapsed;
    }
    collapsed
        .trim_end_matches(|c: char| TRAILING_PUNCTUATION.contains(&c) || c.is_whitespace())
        .to_string()
}

/// Case-folded form of [`clean_display_text`], used for identity and cache keys.
#[must_use]
pub fn fold_key(value: &str) -> String {
    clean_display_text(value).to_lowercase()
}
