// src/lib.rs

//! Version-control history for a file or a line range: the commits that
//! touched it, the people behind them and the work items they reference.
//!
//! [`Annotator`] answers queries straight from the backends;
//! [`CachingAnnotator`] wraps it with a bounded line cache and background
//! prefetching of neighbouring lines.

pub mod annotate;
pub mod cache;
pub mod error;
pub mod git;
pub mod history;
pub mod model;
pub mod report;
pub mod work;

#[cfg(test)]
mod testing;

pub use annotate::{Annotate, Annotation, Annotator, FileAnnotation, LineAnnotation};
pub use cache::{CacheConfig, CachingAnnotator};
pub use error::{AnnotateError, AnnotateResult};
pub use git::{GitHistory, HistoryBackend};
pub use model::{Commit, Contributor, File, Line, LineKey, RelatedFile};
pub use work::{Item, ItemCatalog, ItemServer, UnresolvedItems};
