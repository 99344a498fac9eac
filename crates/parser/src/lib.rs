//! DetailParser and ReleaseParser: turn portal HTML into a per-language
//! [`RawRecord`] (§4.2). Normalization and bilingual merging happen
//! downstream, in `normalizer` and `structurer`.

mod cell;
mod detail_parser;
mod error;
mod overrides;
mod release_parser;
mod types;

pub use cell::{clean_cell, header_key, strip_footnote_markers};
pub use detail_parser::DetailParser;
pub use error::ParseError;
pub use overrides::{ControlledAccessRowEntry, ControlledAccessRowFixes, ControlledAccessRowKey};
pub use release_parser::ReleaseParser;
pub use types::{
    MolecularDataRow, RawControlledAccessUser, RawDataProvider, RawFieldValue, RawPublication,
    RawRecord, RawRelease, RawSummary,
};
