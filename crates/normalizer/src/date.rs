//! Date handling (§4.3.4).

use std::sync::OnceLock;

use regex::Regex;

fn slash_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").unwrap())
}

fn iso_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap())
}

/// Normalizes one date token: `YYYY/M/D` becomes zero-padded `YYYY-MM-DD`;
/// an already-ISO string passes through; anything else passes through
/// verbatim too (callers decide whether an unrecognized shape is an error).
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if iso_date().is_match(trimmed) {
        return trimmed.to_string();
    }
    if let Some(caps) = slash_date().captures(trimmed) {
        let year = &caps[1];
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        return format!("{year}-{month:02}-{day:02}");
    }
    trimmed.to_string()
}

/// A release date field may be a space-separated list of independently
/// normalized dates.
pub fn normalize_date_list(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(normalize_date).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_dates_are_zero_padded() {
        assert_eq!(normalize_date("2021/4/1"), "2021-04-01");
        assert_eq!(normalize_date("2021/12/31"), "2021-12-31");
    }

    #[test]
    fn iso_dates_pass_through() {
        assert_eq!(normalize_date("2021-04-01"), "2021-04-01");
    }

    #[test]
    fn non_matching_strings_pass_through_verbatim() {
        assert_eq!(normalize_date("unknown"), "unknown");
    }

    #[test]
    fn release_date_lists_are_parsed_independently() {
        assert_eq!(
            normalize_date_list("2021/4/1 2022-09-15"),
            vec!["2021-04-01".to_string(), "2022-09-15".to_string()]
        );
    }
}
