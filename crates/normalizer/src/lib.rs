//! The Normalizer (§4.3): runs per `(humVersionId, language)`, turning a
//! `parser::RawRecord` into a [`record::NormalizedRecord`] with the same
//! shape but every field canonicalized — text, URLs, dates, criteria,
//! dataset IDs, molecular-data keys, and publication/grant/CAU fields.

mod criteria;
mod dataset_id;
mod date;
mod error;
mod moldata_keys;
mod publications;
mod record;
mod text;
mod url;

pub use criteria::{normalize_criteria, CriteriaTable};
pub use dataset_id::{normalize_dataset_ids, DatasetIdTables, IdScope};
pub use date::{normalize_date, normalize_date_list};
pub use error::NormalizeError;
pub use moldata_keys::{MolDataKeyResolution, MolDataKeyTable};
pub use publications::{is_title_denied, normalize_doi, normalize_grant_id, parse_period, PublicationDenyLists};
pub use record::{
    normalize_record, resolve_criteria, NormalizedControlledAccessUser, NormalizedDataProvider,
    NormalizedMolDataRow, NormalizedPublication, NormalizedRecord, NormalizedRelease, NormalizedSummary,
    NormalizerTables,
};
pub use text::normalize_text;
pub use url::normalize_url;
