//! Free text normalization (§4.3.1). Applied to summaries, headers, table
//! cell text, and similar textful fields — never to URLs, which have their
//! own normalization in [`crate::url`].

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use common::Lang;

fn runs_of_spaces() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").unwrap())
}

fn colon_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*[:：]\s*").unwrap())
}

fn opening_paren_needs_space() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\S)\(").unwrap())
}

/// Normalizes free text per §4.3.1. `lang` controls whether embedded
/// newlines become a space (Japanese summaries keep line breaks as
/// separators) or are deleted outright (English prose flows across them).
pub fn normalize_text(input: &str, lang: Lang) -> String {
    let nfc: String = input.nfc().collect();

    let mut out = String::with_capacity(nfc.len());
    for ch in nfc.chars() {
        match ch {
            '\u{00A0}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => out.push(' '),
            '（' => out.push('('),
            '）' => out.push(')'),
            '／' => out.push('/'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{FF0D}' | '\u{2212}' => out.push('-'),
            '\n' | '\r' => match lang {
                Lang::Ja => out.push(' '),
                Lang::En => {}
            },
            other => out.push(other),
        }
    }

    let out = colon_whitespace().replace_all(&out, ": ");
    let out = opening_paren_needs_space().replace_all(&out, "$1 (");
    let out = runs_of_spaces().replace_all(&out, " ");

    out.trim().to_string()
}
