//! Bilingual merge (§4.4.3): ja/en scalars become `BilingualText`, ja/en
//! textful fields become `BilingualTextValue`, and ja/en lists are paired
//! element-wise after a matching pass.

use common::{BilingualText, BilingualTextValue, TextValue};

pub fn merge_text(ja: Option<String>, en: Option<String>) -> BilingualText {
    BilingualText::new(ja, en)
}

pub fn merge_text_value(ja: Option<TextValue>, en: Option<TextValue>) -> BilingualTextValue {
    BilingualTextValue { ja, en }
}

/// Pairs two per-language lists into ja/en slots.
///
/// Equal lengths pair by position (the common case: both languages rendered
/// the same rows in the same order). Otherwise, each element is paired by
/// its identity key (publication DOI, grant ID, CAU organisation+name, ...);
/// items with no matching counterpart survive as ja-only or en-only.
pub fn pair_lists<T: Clone>(
    ja: Vec<T>,
    en: Vec<T>,
    identity: impl Fn(&T) -> Option<String>,
) -> Vec<(Option<T>, Option<T>)> {
    if ja.len() == en.len() {
        return ja.into_iter().zip(en).map(|(j, e)| (Some(j), Some(e))).collect();
    }

    let mut en_remaining: Vec<Option<T>> = en.into_iter().map(Some).collect();
    let mut pairs = Vec::new();

    for j in ja {
        let j_key = identity(&j);
        let matched_idx = j_key.as_ref().and_then(|key| {
            en_remaining.iter().position(|slot| {
                slot.as_ref().and_then(|e| identity(e).as_ref().map(|k| k == key)).unwrap_or(false)
            })
        });

        match matched_idx {
            Some(idx) => {
                let e = en_remaining[idx].take().expect("matched slot must be occupied");
                pairs.push((Some(j), Some(e)));
            }
            None => pairs.push((Some(j), None)),
        }
    }

    for e in en_remaining.into_iter().flatten() {
        pairs.push((None, Some(e)));
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_length_lists_pair_by_position() {
        let ja = vec!["a".to_string(), "b".to_string()];
        let en = vec!["A".to_string(), "B".to_string()];
        let pairs = pair_lists(ja, en, |_| None);
        assert_eq!(pairs, vec![(Some("a".to_string()), Some("A".to_string())), (Some("b".to_string()), Some("B".to_string()))]);
    }

    #[test]
    fn unequal_lengths_pair_by_identity_with_leftovers_as_language_only() {
        #[derive(Clone, Debug, PartialEq)]
        struct Item {
            id: String,
            lang: &'static str,
        }
        let ja = vec![Item { id: "x".into(), lang: "ja" }, Item { id: "y".into(), lang: "ja" }];
        let en = vec![Item { id: "x".into(), lang: "en" }];

        let pairs = pair_lists(ja, en, |i: &Item| Some(i.id.clone()));
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.as_ref().unwrap().id, "x");
        assert_eq!(pairs[0].1.as_ref().unwrap().lang, "en");
        assert_eq!(pairs[1].0.as_ref().unwrap().id, "y");
        assert!(pairs[1].1.is_none());
    }

    #[test]
    fn unmatched_en_only_item_survives() {
        #[derive(Clone, Debug, PartialEq)]
        struct Item {
            id: String,
        }
        let ja: Vec<Item> = vec![];
        let en = vec![Item { id: "only-en".into() }];

        let pairs = pair_lists(ja, en, |i: &Item| Some(i.id.clone()));
        assert_eq!(pairs, vec![(None, Some(Item { id: "only-en".into() }))]);
    }
}
