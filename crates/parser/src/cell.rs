//! Per-cell edge-case policy, applied uniformly by both parsers (§4.2):
//! empty-cell normalization, footnote-marker stripping, and header-key
//! comparison that is case-, whitespace-, and punctuation-insensitive.

use unicode_normalization::UnicodeNormalization;

/// `""` and `"-"` both mean "no value"; everything else survives with its
/// footnote marker stripped and whitespace trimmed.
pub fn clean_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    let stripped = strip_footnote_markers(trimmed);
    let stripped = stripped.trim();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Strips one leading footnote marker: `※`, or `*` optionally followed by a
/// single digit (`*1`, `*2`, ...). Repeats in case a cell carries more than
/// one marker.
pub fn strip_footnote_markers(s: &str) -> String {
    let mut rest = s.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix('※') {
            rest = after.trim_start();
            continue;
        }
        if let Some(after) = rest.strip_prefix('*') {
            let after = after.trim_start();
            let mut chars = after.char_indices();
            if let Some((_, c)) = chars.next() {
                if c.is_ascii_digit() {
                    let next_idx = chars.next().map(|(i, _)| i).unwrap_or(after.len());
                    rest = after[next_idx..].trim_start();
                    continue;
                }
            }
            rest = after;
            continue;
        }
        break;
    }
    rest.to_string()
}

/// Canonicalizes a header label for comparison: NFKC, lowercase, strip
/// punctuation/whitespace entirely. Two headers that render differently but
/// compare equal under this function are treated as the same column.
pub fn header_key(raw: &str) -> String {
    raw.nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}
