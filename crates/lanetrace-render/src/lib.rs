#![forbid(unsafe_code)]

//! Pure geometry for classified lane journeys: lane stacking, per-individual paths, gradient
//! stops and the aggregated flow graph. Nothing here touches a rendering surface; the outputs
//! are plain data for an external drawing layer.

pub mod flow;
pub mod geom;
pub mod gradient;
pub mod layout;
pub mod model;
pub mod path;
pub mod scale;
pub mod svg;

pub use flow::{AggregationEngine, FlowConfig, end_node_id, start_node_id};
pub use gradient::{GradientColorMapper, JourneyPalette, PaletteConfig, transition_bands};
pub use layout::{LaneLayoutManager, LayoutConfig, PositionCache, SlotTable};
pub use model::{
    ColorStop, FlowGraph, FlowLink, FlowNode, LaneLayout, LaneLayoutSet, OutcomeGroup,
    PathDescriptor, Segment, SubBuckets,
};
pub use path::{GeometryConfig, PathGeometryEngine, TransitionRanks};
pub use scale::TimeScale;
pub use svg::path_data;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid timeline: start {start} must precede now {now}")]
    InvalidTimeline {
        start: chrono::NaiveDateTime,
        now: chrono::NaiveDateTime,
    },
    #[error("invalid render config: {message}")]
    InvalidConfig { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn f64_cmp(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}
