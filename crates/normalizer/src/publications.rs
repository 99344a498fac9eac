//! Publications / grants / controlled-access-user normalization (§4.3.7).

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::date::normalize_date;

#[derive(Debug, Clone, Default)]
pub struct PublicationDenyLists {
    pub title_deny_list: HashSet<String>,
    pub doi_deny_list: HashSet<String>,
    pub grant_deny_list: HashSet<String>,
}

impl PublicationDenyLists {
    pub fn new() -> Self {
        Self::default()
    }
}

/// "In-submission" placeholder titles never survive into the structured
/// output.
pub fn is_title_denied(title: &str, deny: &PublicationDenyLists) -> bool {
    deny.title_deny_list.contains(title.trim())
}

pub fn normalize_doi(raw: Option<&str>, deny: &PublicationDenyLists) -> Option<String> {
    let doi = raw?.trim();
    if doi.is_empty() || deny.doi_deny_list.contains(doi) {
        return None;
    }
    Some(doi.to_string())
}

/// Full-width digits/letters fold to their half-width ASCII equivalents
/// (`\u{FF10}`-`\u{FF19}`, `\u{FF21}`-`\u{FF3A}`, `\u{FF41}`-`\u{FF5A}` are
/// all a fixed `0xFEE0` offset from ASCII), then the deny-list filters
/// known-bad grant IDs.
pub fn normalize_grant_id(raw: &str, deny: &PublicationDenyLists) -> Option<String> {
    let folded: String = raw
        .trim()
        .chars()
        .map(|c| {
            let code = c as u32;
            if (0xFF10..=0xFF19).contains(&code) || (0xFF21..=0xFF3A).contains(&code) || (0xFF41..=0xFF5A).contains(&code) {
                char::from_u32(code - 0xFEE0).unwrap_or(c)
            } else {
                c
            }
        })
        .collect();

    if folded.is_empty() || deny.grant_deny_list.contains(&folded) {
        return None;
    }
    Some(folded)
}

fn slash_period() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4}/\d{1,2}/\d{1,2})-(\d{4}/\d{1,2}/\d{1,2})$").unwrap())
}

fn iso_period() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})-(\d{4}-\d{2}-\d{2})$").unwrap())
}

/// Parses a controlled-access-user usage period into `(start, end)` ISO
/// dates. Accepts either `YYYY/M/D-YYYY/M/D` or `YYYY-MM-DD-YYYY-MM-DD`.
pub fn parse_period(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim();
    if let Some(caps) = slash_period().captures(trimmed) {
        return Some((normalize_date(&caps[1]), normalize_date(&caps[2])));
    }
    if let Some(caps) = iso_period().captures(trimmed) {
        return Some((caps[1].to_string(), caps[2].to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_title_is_recognized() {
        let mut deny = PublicationDenyLists::new();
        deny.title_deny_list.insert("In submission".to_string());
        assert!(is_title_denied("In submission", &deny));
        assert!(!is_title_denied("Published Title", &deny));
    }

    #[test]
    fn denied_doi_becomes_none() {
        let mut deny = PublicationDenyLists::new();
        deny.doi_deny_list.insert("10.0000/bad".to_string());
        assert_eq!(normalize_doi(Some("10.0000/bad"), &deny), None);
        assert_eq!(normalize_doi(Some("10.1000/good"), &deny), Some("10.1000/good".to_string()));
        assert_eq!(normalize_doi(None, &deny), None);
    }

    #[test]
    fn grant_id_fullwidth_folds_to_halfwidth() {
        let deny = PublicationDenyLists::new();
        assert_eq!(normalize_grant_id("ＪＰ２０Ｋ１２３４５", &deny), Some("JP20K12345".to_string()));
    }

    #[test]
    fn grant_id_deny_list_filters_after_folding() {
        let mut deny = PublicationDenyLists::new();
        deny.grant_deny_list.insert("JP00K00000".to_string());
        assert_eq!(normalize_grant_id("ＪＰ００Ｋ０００００", &deny), None);
    }

    #[test]
    fn slash_period_is_normalized_to_iso() {
        assert_eq!(
            parse_period("2020/4/1-2021/3/31"),
            Some(("2020-04-01".to_string(), "2021-03-31".to_string()))
        );
    }

    #[test]
    fn iso_period_passes_through() {
        assert_eq!(
            parse_period("2020-04-01-2021-03-31"),
            Some(("2020-04-01".to_string(), "2021-03-31".to_string()))
        );
    }

    #[test]
    fn unrecognized_period_shape_returns_none() {
        assert_eq!(parse_period("whenever"), None);
    }
}
