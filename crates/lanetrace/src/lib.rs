#![forbid(unsafe_code)]

//! `lanetrace` turns per-individual captivity records into lane journeys: every individual's
//! history becomes a continuous path across a fixed set of lanes, and the whole dataset is
//! aggregated into a start → outcome flow graph.
//!
//! The heavy lifting lives in two crates re-exported here:
//! - `lanetrace-core`: ingestion, date normalization, classification (re-exported at the root)
//! - `lanetrace-render`: lane layout, path geometry, gradients and flow aggregation
//!   (`lanetrace::render`)
//!
//! [`Engine`] wires them together.

pub use lanetrace_core::*;

pub mod render {
    pub use lanetrace_render::*;
}

mod config;
mod engine;

pub use config::{LaneOverride, PipelineConfig, Viewport};
pub use engine::{Engine, IndividualOutput, LaneOutput, PipelineOutput};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] lanetrace_core::Error),
    #[error(transparent)]
    Render(#[from] lanetrace_render::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
