#![forbid(unsafe_code)]

//! Captivity-timeline records → classified lane journeys (headless).
//!
//! Stages, leaf first:
//! - [`ingest`]: CSV/JSON → typed [`RawRecord`]s
//! - [`date`]: heterogeneous date cells → instants or an explicit invalid marker
//! - [`classify`]: records → initial lane + ordered transition events
//! - [`lane`]: the fixed lane registry and per-dataset membership
//!
//! Every stage reports recoverable problems through [`Diagnostics`] instead of failing.

pub mod classify;
pub mod config;
pub mod date;
pub mod diagnostics;
pub mod error;
pub mod ingest;
pub mod lane;
pub mod record;
pub mod summary;

pub use classify::{
    ClassifyError, Event, EventKind, Individual, JourneyType, MethodBasis, ReleaseDetail,
    StateClassifier, classify_all,
};
pub use config::ClassifyConfig;
pub use date::{DateNormalizer, NormalizedDate};
pub use diagnostics::{Diagnostic, Diagnostics, Stage};
pub use error::{Error, Result};
pub use ingest::{ColumnMap, Ingested, read_csv, read_json};
pub use lane::{LaneId, LaneRegistry, LaneSpec, ReleaseMethod, Section, Vitality};
pub use record::RawRecord;
pub use summary::Summary;

#[cfg(test)]
mod tests;
