//! Parses a research detail page into a [`RawRecord`] (§4.2).
//!
//! The page is a handful of sections (`#summary`, `#data-provider`,
//! `#publications`, `#controlled-access-users`) plus one or more
//! `table.molecular-data` tables. Every cell goes through [`clean_cell`]
//! before landing in the record; header comparison goes through
//! [`header_key`] so visually-identical-but-differently-encoded column
//! names collapse onto one canonical key.

use scraper::{ElementRef, Html, Selector};

use crate::cell::{clean_cell, header_key};
use crate::error::ParseError;
use crate::overrides::ControlledAccessRowFixes;
use crate::types::{
    MolecularDataRow, RawControlledAccessUser, RawDataProvider, RawFieldValue, RawPublication,
    RawRecord, RawSummary,
};
use common::TextValue;
use tracing::debug;

pub struct DetailParser<'a> {
    pub row_fixes: &'a ControlledAccessRowFixes,
}

impl<'a> DetailParser<'a> {
    pub fn new(row_fixes: &'a ControlledAccessRowFixes) -> Self {
        Self { row_fixes }
    }

    pub fn parse(&self, hum_id: &str, hum_version_id: &str, html: &str) -> Result<RawRecord, ParseError> {
        let document = Html::parse_document(html);

        Ok(RawRecord {
            hum_version_id: hum_version_id.to_string(),
            summary: parse_summary(&document)?,
            molecular_data: parse_molecular_data(&document, hum_id, self.row_fixes)?,
            data_provider: parse_data_provider(&document),
            publications: parse_publications(&document),
            controlled_access_users: parse_controlled_access_users(&document),
            releases: Vec::new(),
        })
    }
}

fn select_one<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn select_all<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document.select(&selector).collect()
}

fn text_value_of(el: ElementRef) -> TextValue {
    let text = el.text().collect::<String>().trim().to_string();
    TextValue::new(text, el.inner_html())
}

fn parse_summary(document: &Html) -> Result<RawSummary, ParseError> {
    let title = select_one(document, "#summary .title").map(text_value_of);
    let aims = select_one(document, "#summary .aims").map(text_value_of);
    let methods = select_one(document, "#summary .methods").map(text_value_of);
    let targets = select_one(document, "#summary .targets").map(text_value_of);
    let url = select_one(document, "#summary a.detail-url")
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string);

    let datasets = select_all(document, "#summary .dataset-ids li")
        .into_iter()
        .filter_map(|el| clean_cell(&el.text().collect::<String>()))
        .collect();

    let footers = select_all(document, "#summary .footnotes li")
        .into_iter()
        .map(text_value_of)
        .collect();

    Ok(RawSummary {
        title,
        aims,
        methods,
        targets,
        url,
        datasets,
        footers,
    })
}

fn parse_molecular_data(
    document: &Html,
    hum_id: &str,
    row_fixes: &ControlledAccessRowFixes,
) -> Result<Vec<MolecularDataRow>, ParseError> {
    let mut rows = Vec::new();

    for table in select_all(document, "table.molecular-data") {
        let header_selector = Selector::parse("thead th").map_err(|e| ParseError::Html(e.to_string()))?;
        let headers: Vec<String> = table
            .select(&header_selector)
            .map(|th| header_key(&th.text().collect::<String>()))
            .collect();

        let row_selector = Selector::parse("tbody tr").map_err(|e| ParseError::Html(e.to_string()))?;
        let cell_selector = Selector::parse("td").map_err(|e| ParseError::Html(e.to_string()))?;

        for tr in table.select(&row_selector) {
            let cells: Vec<ElementRef> = tr.select(&cell_selector).collect();
            if cells.is_empty() {
                continue;
            }

            let raw_cell_texts: Vec<String> =
                cells.iter().map(|c| c.text().collect::<String>().trim().to_string()).collect();
            let first_cell = raw_cell_texts.first().cloned().unwrap_or_default();

            let fixed_cells = row_fixes.lookup(hum_id, cells.len(), &first_cell);

            let mut row = MolecularDataRow::default();
            if let Some(fixed) = fixed_cells {
                debug!(hum_id, first_cell, "applied controlled-access row hotfix");
                for (idx, value) in fixed.iter().enumerate() {
                    insert_cell(&mut row, &headers, idx, TextValue::new(value.clone(), value.clone()));
                }
            } else {
                for (idx, cell) in cells.iter().enumerate() {
                    let Some(cleaned) = clean_cell(&cell.text().collect::<String>()) else {
                        continue;
                    };
                    insert_cell(&mut row, &headers, idx, TextValue::new(cleaned, cell.inner_html()));
                }
            }

            row.id = raw_cell_texts.first().cloned();
            row.extracted_dataset_ids = extract_dataset_id_tokens(&raw_cell_texts.join(" "));
            rows.push(row);
        }
    }

    Ok(rows)
}

fn insert_cell(row: &mut MolecularDataRow, headers: &[String], idx: usize, value: TextValue) {
    let key = headers.get(idx).cloned().unwrap_or_else(|| format!("column{idx}"));
    row.data
        .entry(key)
        .and_modify(|existing| merge_field_value(existing, value.clone()))
        .or_insert(RawFieldValue::Single(value));
}

/// A header repeated within one row accumulates into `Multi` rather than
/// overwriting (§9 "mergeValue: null-absorb, array-concat, scalar ->
/// singleton-array on second hit").
fn merge_field_value(existing: &mut RawFieldValue, next: TextValue) {
    match existing {
        RawFieldValue::Single(first) => {
            *existing = RawFieldValue::Multi(vec![first.clone(), next]);
        }
        RawFieldValue::Multi(values) => values.push(next),
    }
}

/// Harvests every dataset-ID-shaped token (`JGAD\d+`, `JGAS\d+`, and the
/// other namespace prefixes) from a blob of row text, for the Structurer's
/// inversion pass (§4.4.1). Reconciliation itself happens in Normalizer;
/// this is a coarse, over-inclusive harvest.
fn extract_dataset_id_tokens(text: &str) -> Vec<String> {
    const PREFIXES: &[&str] = &["JGAD", "JGAS", "DRA", "GEA", "BP", "METABO", "NBDC"];
    text.split(|c: char| c.is_whitespace() || c == ',' || c == '、' || c == '/')
        .filter(|token| PREFIXES.iter().any(|p| token.starts_with(p)))
        .map(str::to_string)
        .collect()
}

fn parse_data_provider(document: &Html) -> RawDataProvider {
    let text_list = |selector: &str| -> Vec<String> {
        select_all(document, selector)
            .into_iter()
            .filter_map(|el| clean_cell(&el.text().collect::<String>()))
            .collect()
    };

    RawDataProvider {
        principal_investigator: text_list("#data-provider .principal-investigator li"),
        affiliation: text_list("#data-provider .affiliation li"),
        project_name: text_list("#data-provider .project-name li"),
        project_url: text_list("#data-provider .project-url li"),
        grants: text_list("#data-provider .grants li"),
    }
}

fn parse_publications(document: &Html) -> Vec<RawPublication> {
    select_all(document, "#publications .publication")
        .into_iter()
        .map(|el| RawPublication {
            title: select_one_in(el, ".title").and_then(|c| clean_cell(&c)),
            doi: select_one_in(el, ".doi").and_then(|c| clean_cell(&c)),
            dataset_ids_raw: extract_dataset_id_tokens(&el.text().collect::<String>()),
            period_raw: select_one_in(el, ".period").and_then(|c| clean_cell(&c)),
        })
        .collect()
}

fn parse_controlled_access_users(document: &Html) -> Vec<RawControlledAccessUser> {
    select_all(document, "#controlled-access-users .cau")
        .into_iter()
        .map(|el| RawControlledAccessUser {
            organisation: select_one_in(el, ".organisation").and_then(|c| clean_cell(&c)),
            name: select_one_in(el, ".name").and_then(|c| clean_cell(&c)),
            dataset_ids_raw: extract_dataset_id_tokens(&el.text().collect::<String>()),
            period_raw: select_one_in(el, ".period").and_then(|c| clean_cell(&c)),
        })
        .collect()
}

fn select_one_in(el: ElementRef, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    el.select(&selector).next().map(|c| c.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <html><body>
        <div id="summary">
            <p class="aims">Study aims text</p>
            <p class="methods">Study methods text</p>
            <p class="targets">Study targets text</p>
            <a class="detail-url" href="/detail/hum0014">link</a>
            <ul class="dataset-ids"><li>JGAD000001</li><li>-</li></ul>
            <ul class="footnotes"><li>※ footnote one</li></ul>
        </div>
        <table class="molecular-data">
            <thead><tr><th>ID</th><th>Data Type</th></tr></thead>
            <tbody>
                <tr><td>T2DM-1</td><td>※1 WGS JGAD000010</td></tr>
                <tr><td></td><td>-</td></tr>
            </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn parses_summary_section() {
        let fixes = ControlledAccessRowFixes::new();
        let parser = DetailParser::new(&fixes);
        let record = parser.parse("hum0014", "hum0014-v3", SAMPLE_HTML).unwrap();

        assert_eq!(record.summary.aims.as_ref().unwrap().text, "Study aims text");
        assert_eq!(record.summary.url.as_deref(), Some("/detail/hum0014"));
        assert_eq!(record.summary.datasets, vec!["JGAD000001".to_string()]);
        assert_eq!(record.summary.footers.len(), 1);
    }

    #[test]
    fn parses_molecular_data_rows_and_strips_footnotes() {
        let fixes = ControlledAccessRowFixes::new();
        let parser = DetailParser::new(&fixes);
        let record = parser.parse("hum0014", "hum0014-v3", SAMPLE_HTML).unwrap();

        assert_eq!(record.molecular_data.len(), 2);
        let first = &record.molecular_data[0];
        assert_eq!(first.id.as_deref(), Some("T2DM-1"));
        match first.data.get("datatype") {
            Some(RawFieldValue::Single(tv)) => assert_eq!(tv.text, "WGS JGAD000010"),
            other => panic!("expected single field value, got {other:?}"),
        }
        assert_eq!(first.extracted_dataset_ids, vec!["JGAD000010".to_string()]);
    }

    #[test]
    fn empty_second_row_cell_has_no_data_entry() {
        let fixes = ControlledAccessRowFixes::new();
        let parser = DetailParser::new(&fixes);
        let record = parser.parse("hum0014", "hum0014-v3", SAMPLE_HTML).unwrap();

        let second = &record.molecular_data[1];
        assert!(second.data.is_empty());
    }

    #[test]
    fn controlled_access_row_fix_replaces_parsed_cells() {
        let mut fixes = ControlledAccessRowFixes::new();
        fixes.insert(
            crate::overrides::ControlledAccessRowKey {
                hum_id: "hum0014".into(),
                cell_count: 2,
                first_cell: "T2DM-1".into(),
            },
            vec!["T2DM-1".into(), "Fixed Data Type".into()],
        );
        let parser = DetailParser::new(&fixes);
        let record = parser.parse("hum0014", "hum0014-v3", SAMPLE_HTML).unwrap();

        match record.molecular_data[0].data.get("datatype") {
            Some(RawFieldValue::Single(tv)) => assert_eq!(tv.text, "Fixed Data Type"),
            other => panic!("expected fixed cell, got {other:?}"),
        }
    }
}
