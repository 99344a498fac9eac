//! Identifier newtypes for the portal's stable, versioned, and dataset ids.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when parsing one of this crate's identifier newtypes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdParseError {
    #[error("invalid humId {0:?}: expected `hum` + 4 digits")]
    InvalidHumId(String),
    #[error("invalid humVersionId {0:?}: expected `<humId>-v<n>`")]
    InvalidHumVersionId(String),
}

/// Opaque stable research identifier, format `hum` + 4 zero-padded digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HumId(u32);

impl HumId {
    pub fn new(n: u32) -> Self {
        HumId(n)
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    /// The next humId after the highest currently allocated one, or `hum0001`
    /// when none exist yet (§4.6).
    pub fn next_after(existing: impl IntoIterator<Item = HumId>) -> HumId {
        let max = existing.into_iter().map(|h| h.0).max().unwrap_or(0);
        HumId(max + 1)
    }
}

impl fmt::Display for HumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hum{:04}", self.0)
    }
}

impl FromStr for HumId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("hum")
            .filter(|rest| rest.len() == 4 && rest.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| IdParseError::InvalidHumId(s.to_string()))?;
        let n: u32 = digits
            .parse()
            .map_err(|_| IdParseError::InvalidHumId(s.to_string()))?;
        Ok(HumId(n))
    }
}

impl TryFrom<String> for HumId {
    type Error = IdParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HumId> for String {
    fn from(value: HumId) -> Self {
        value.to_string()
    }
}

/// Snapshot identifier: `<humId>-v<version>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HumVersionId {
    pub hum_id: HumId,
    pub version: u32,
}

impl HumVersionId {
    pub fn new(hum_id: HumId, version: u32) -> Self {
        Self { hum_id, version }
    }
}

impl fmt::Display for HumVersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.hum_id, self.version)
    }
}

impl FromStr for HumVersionId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hum_part, version_part) = s
            .split_once("-v")
            .ok_or_else(|| IdParseError::InvalidHumVersionId(s.to_string()))?;
        let hum_id: HumId = hum_part
            .parse()
            .map_err(|_| IdParseError::InvalidHumVersionId(s.to_string()))?;
        let version: u32 = version_part
            .parse()
            .map_err(|_| IdParseError::InvalidHumVersionId(s.to_string()))?;
        Ok(HumVersionId { hum_id, version })
    }
}

impl TryFrom<String> for HumVersionId {
    type Error = IdParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HumVersionId> for String {
    fn from(value: HumVersionId) -> Self {
        value.to_string()
    }
}

/// An opaque dataset/study identifier drawn from one of several archive
/// namespaces (JGAD, JGAS, DRA, GEA, BP, METABO, NBDC, ...). Kept as a
/// validated wrapper rather than a bare `String` so "is this a study id"
/// checks (the core invariant in §3/§8) are a method call, not a regex
/// re-written at every call site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(raw: impl Into<String>) -> Self {
        DatasetId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for study identifiers that must never survive into structured
    /// output (§3 invariant, §8 testable property).
    pub fn is_jgas(&self) -> bool {
        is_jgas_str(&self.0)
    }

    pub fn is_jgad(&self) -> bool {
        self.0.starts_with("JGAD")
    }

    /// The leading alphabetic namespace tag, e.g. `JGAD`, `DRA`, `METABO`.
    pub fn namespace(&self) -> &str {
        self.0
            .trim_start_matches(|c: char| !c.is_ascii_alphabetic())
            .split(|c: char| c.is_ascii_digit())
            .next()
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DatasetId {
    fn from(value: String) -> Self {
        DatasetId(value)
    }
}

impl From<&str> for DatasetId {
    fn from(value: &str) -> Self {
        DatasetId(value.to_string())
    }
}

/// Standalone predicate usable on plain strings before they've been wrapped
/// in a [`DatasetId`] (e.g. mid-normalization, in the ID pipeline).
pub fn is_jgas_str(s: &str) -> bool {
    let Some(rest) = s.strip_prefix("JGAS") else {
        return false;
    };
    rest.len() == 6 && rest.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hum_id_roundtrip() {
        let id: HumId = "hum0014".parse().unwrap();
        assert_eq!(id.number(), 14);
        assert_eq!(id.to_string(), "hum0014");
    }

    #[test]
    fn hum_id_rejects_bad_format() {
        assert!("hum14".parse::<HumId>().is_err());
        assert!("HUM0014".parse::<HumId>().is_err());
        assert!("hum00140".parse::<HumId>().is_err());
    }

    #[test]
    fn hum_id_next_after_empty_is_one() {
        let next = HumId::next_after(std::iter::empty());
        assert_eq!(next.to_string(), "hum0001");
    }

    #[test]
    fn hum_id_next_after_existing() {
        let existing = vec!["hum0001".parse().unwrap(), "hum0014".parse().unwrap()];
        let next = HumId::next_after(existing);
        assert_eq!(next.to_string(), "hum0015");
    }

    #[test]
    fn hum_version_id_roundtrip() {
        let v: HumVersionId = "hum0014-v3".parse().unwrap();
        assert_eq!(v.hum_id.to_string(), "hum0014");
        assert_eq!(v.version, 3);
        assert_eq!(v.to_string(), "hum0014-v3");
    }

    #[test]
    fn dataset_id_jgas_detection() {
        assert!(DatasetId::new("JGAS000114").is_jgas());
        assert!(!DatasetId::new("JGAD000114").is_jgas());
        assert!(!DatasetId::new("JGAS11").is_jgas());
        assert!(is_jgas_str("JGAS000114"));
    }

    #[test]
    fn dataset_id_namespace() {
        assert_eq!(DatasetId::new("JGAD000220").namespace(), "JGAD");
        assert_eq!(DatasetId::new("DRA000123").namespace(), "DRA");
    }
}
