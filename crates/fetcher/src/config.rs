//! Skip lists and release-URL overrides, consulted before fetching (§4.1).
//! The shape mirrors the `crawl-hotfix-mapping.json` config file (§6); this
//! crate only owns the in-memory representation, not the file's schema for
//! the *other* hotfix tables (controlled-access row fixes etc.), which live
//! in `parser`.

use std::collections::{HashMap, HashSet};

use common::{HumId, Lang};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    pub portal_base_url: String,

    /// humIds whose pages are never fetched, regardless of `useCache`.
    #[serde(default)]
    pub skip_list: HashSet<HumId>,

    /// Per-(humVersionId, language) release page URL suffix, overriding the
    /// conventional `/humVersionId/lang` path.
    #[serde(default)]
    pub release_url_overrides: HashMap<String, String>,
}

impl FetchConfig {
    pub fn is_skipped(&self, hum_id: &HumId) -> bool {
        self.skip_list.contains(hum_id)
    }

    fn override_key(hum_version_id: &str, lang: Lang) -> String {
        format!("{hum_version_id}:{lang}")
    }

    pub fn release_url_override(&self, hum_version_id: &str, lang: Lang) -> Option<&str> {
        self.release_url_overrides
            .get(&Self::override_key(hum_version_id, lang))
            .map(String::as_str)
    }

    pub fn detail_url(&self, hum_version_id: &str, lang: Lang) -> String {
        format!(
            "{}/{}/detail/{}",
            self.portal_base_url.trim_end_matches('/'),
            lang,
            hum_version_id
        )
    }

    pub fn release_url(&self, hum_version_id: &str, lang: Lang) -> String {
        if let Some(suffix) = self.release_url_override(hum_version_id, lang) {
            return format!("{}{}", self.portal_base_url.trim_end_matches('/'), suffix);
        }
        format!(
            "{}/{}/release/{}",
            self.portal_base_url.trim_end_matches('/'),
            lang,
            hum_version_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_url_uses_override_when_present() {
        let mut cfg = FetchConfig {
            portal_base_url: "https://portal.example".into(),
            ..Default::default()
        };
        cfg.release_url_overrides
            .insert("hum0014-v3:ja".into(), "/legacy/hum0014-v3.html".into());

        assert_eq!(
            cfg.release_url("hum0014-v3", Lang::Ja),
            "https://portal.example/legacy/hum0014-v3.html"
        );
        assert_eq!(
            cfg.release_url("hum0014-v3", Lang::En),
            "https://portal.example/en/release/hum0014-v3"
        );
    }

    #[test]
    fn skip_list_respects_hum_id() {
        let mut cfg = FetchConfig::default();
        let hum_id: HumId = "hum0014".parse().unwrap();
        cfg.skip_list.insert(hum_id.clone());
        assert!(cfg.is_skipped(&hum_id));
        assert!(!cfg.is_skipped(&"hum0015".parse().unwrap()));
    }
}
