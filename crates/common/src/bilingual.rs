//! The bilingual tagged-product types shared across every stage.
//!
//! Modeled as `{ja?, en?}` rather than an inheritance hierarchy off some
//! "localized string" base — there's no variance here, just two optional
//! slots and a handful of helpers for picking, merging, and pairing them.

use serde::{Deserialize, Serialize};

/// Plain bilingual text: title, url, and other scalar fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    pub ja: Option<String>,
    pub en: Option<String>,
}

impl BilingualText {
    pub fn new(ja: Option<String>, en: Option<String>) -> Self {
        Self { ja, en }
    }

    pub fn has_any(&self) -> bool {
        self.ja.is_some() || self.en.is_some()
    }

    /// Picks the requested language, falling back ja → en (§4.7.4 projection rule).
    pub fn pick_lang(&self, lang: Lang) -> Option<&str> {
        match lang {
            Lang::Ja => self.ja.as_deref().or(self.en.as_deref()),
            Lang::En => self.en.as_deref().or(self.ja.as_deref()),
        }
    }
}

/// Textful content that preserves source markup for re-display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
    #[serde(rename = "rawHtml")]
    pub raw_html: String,
}

impl TextValue {
    pub fn new(text: impl Into<String>, raw_html: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw_html: raw_html.into(),
        }
    }
}

/// Bilingual textful content: summaries, table cells, release notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualTextValue {
    pub ja: Option<TextValue>,
    pub en: Option<TextValue>,
}

impl BilingualTextValue {
    pub fn has_any(&self) -> bool {
        self.ja.is_some() || self.en.is_some()
    }

    pub fn pick_lang(&self, lang: Lang) -> Option<&TextValue> {
        match lang {
            Lang::Ja => self.ja.as_ref().or(self.en.as_ref()),
            Lang::En => self.en.as_ref().or(self.ja.as_ref()),
        }
    }
}

/// Which language half of a bilingual record a NormalizedRecord belongs to,
/// and which language a search response should be projected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ja,
    En,
}

impl Lang {
    pub fn as_str(self) -> &'static str {
        match self {
            Lang::Ja => "ja",
            Lang::En => "en",
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ja" => Ok(Lang::Ja),
            "en" => Ok(Lang::En),
            other => Err(format!("unknown language {other:?}")),
        }
    }
}

/// Merges a ja half and an en half of the same logical scalar field into one
/// bilingual value. Used by the Structurer's per-field merge (§4.4.3).
pub fn merge_pair(ja: Option<String>, en: Option<String>) -> BilingualText {
    BilingualText { ja, en }
}

/// Merges a ja half and an en half of the same textful field, preserving
/// each side's raw markup independently.
pub fn merge_text_pair(ja: Option<TextValue>, en: Option<TextValue>) -> BilingualTextValue {
    BilingualTextValue { ja, en }
}
