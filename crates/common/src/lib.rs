//! Shared domain types for the humportal ingestion pipeline.
//!
//! Every stage crate (`fetcher`, `parser`, `normalizer`, `structurer`,
//! `facet`, `indexwriter`, `search`) depends on this crate for:
//!
//! - The stable identifier newtypes ([`HumId`], [`HumVersionId`], [`DatasetId`]).
//! - The bilingual tagged-product types ([`BilingualText`], [`BilingualTextValue`]).
//! - The structured entity shapes ([`Research`], [`ResearchVersion`], [`Dataset`],
//!   [`Experiment`]) that every stage reads or writes.
//! - Canonical-JSON equality ([`canonical_eq`]), used by the Structurer to
//!   decide dataset versioning.
//! - The shared [`PipelineError`] taxonomy and [`StageReport`] outcome type.

mod bilingual;
mod canonical;
mod error;
mod ids;
mod model;
mod report;
pub mod retry;

pub use bilingual::{merge_pair, merge_text_pair, BilingualText, BilingualTextValue, Lang, TextValue};
pub use canonical::{canonical_eq, canonical_key};
pub use error::PipelineError;
pub use ids::{is_jgas_str, DatasetId, HumId, HumVersionId, IdParseError};
pub use model::{
    ControlledAccessUser, Criteria, DataProvider, Dataset, DatasetRef, Disease, Experiment,
    ExperimentBase, FieldValue, Grant, Platform, PolicyRef, Publication, Research,
    ResearchVersion, Searchable, Status, VariantCounts,
};
pub use report::StageReport;
