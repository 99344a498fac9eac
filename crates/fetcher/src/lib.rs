//! The cached HTTP fetcher (§4.1).
//!
//! Given `(humId, humVersionId, language, pageKind)`, returns raw HTML,
//! consulting a per-humId skip list and a per-(humVersionId, language)
//! release-URL override table before hitting the network, and a
//! content-addressed on-disk cache before hitting either.

mod cache;
mod client;
mod config;
mod error;

pub use cache::HttpCache;
pub use client::Fetcher;
pub use config::FetchConfig;
pub use error::{FetchError, PageKind};
