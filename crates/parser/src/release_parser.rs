//! Parses a release-history page into the `releases` field of a
//! [`RawRecord`] (§4.2). Release pages are simpler than detail pages: one
//! table, one row per version, no controlled-access special casing.

use scraper::{Html, Selector};

use crate::cell::clean_cell;
use crate::error::ParseError;
use crate::types::RawRelease;
use common::TextValue;

pub struct ReleaseParser;

impl ReleaseParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, html: &str) -> Result<Vec<RawRelease>, ParseError> {
        let document = Html::parse_document(html);
        let row_selector =
            Selector::parse("table.release-history tbody tr").map_err(|e| ParseError::Html(e.to_string()))?;
        let cell_selector = Selector::parse("td").map_err(|e| ParseError::Html(e.to_string()))?;

        let mut releases = Vec::new();
        for tr in document.select(&row_selector) {
            let cells: Vec<_> = tr.select(&cell_selector).collect();
            if cells.is_empty() {
                continue;
            }

            let version = cells.first().and_then(|c| clean_cell(&c.text().collect::<String>()));
            let release_date_raw = cells.get(1).and_then(|c| clean_cell(&c.text().collect::<String>()));
            let note = cells.get(2).and_then(|c| {
                clean_cell(&c.text().collect::<String>()).map(|text| TextValue::new(text, c.inner_html()))
            });

            releases.push(RawRelease {
                version,
                release_date_raw,
                note,
            });
        }

        Ok(releases)
    }
}

impl Default for ReleaseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <html><body>
        <table class="release-history">
            <tbody>
                <tr><td>3</td><td>2023-04-01</td><td>Added WGS data</td></tr>
                <tr><td>2</td><td>2021-09-15</td><td>-</td></tr>
            </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn parses_each_release_row() {
        let parser = ReleaseParser::new();
        let releases = parser.parse(SAMPLE_HTML).unwrap();

        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].version.as_deref(), Some("3"));
        assert_eq!(releases[0].release_date_raw.as_deref(), Some("2023-04-01"));
        assert_eq!(releases[0].note.as_ref().unwrap().text, "Added WGS data");
    }

    #[test]
    fn dash_note_cell_is_dropped() {
        let parser = ReleaseParser::new();
        let releases = parser.parse(SAMPLE_HTML).unwrap();

        assert!(releases[1].note.is_none());
    }
}
