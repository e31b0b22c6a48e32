use crate::config::PipelineConfig;
use crate::PipelineResult;
use chrono::NaiveDate;
use lanetrace_core::{
    Diagnostics, Event, Individual, Ingested, JourneyType, LaneId, LaneRegistry, RawRecord,
    Stage, Summary, classify_all,
};
use lanetrace_render::{
    AggregationEngine, ColorStop, FlowGraph, GradientColorMapper, LaneLayout, LaneLayoutManager,
    PathDescriptor, PathGeometryEngine, PositionCache, TimeScale, path_data,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualOutput {
    pub id: String,
    pub initial_lane: LaneId,
    pub final_lane: LaneId,
    /// Slot within the final lane.
    pub lane_position: Option<usize>,
    pub journey_type: JourneyType,
    pub events: Vec<Event>,
    pub path: PathDescriptor,
    pub path_data: String,
    pub color_stops: Vec<ColorStop>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneOutput {
    #[serde(flatten)]
    pub layout: LaneLayout,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub timeline: TimeScale,
    pub total_height: f64,
    pub individuals: Vec<IndividualOutput>,
    pub lanes: Vec<LaneOutput>,
    pub flow: FlowGraph,
    pub summary: Summary,
    pub diagnostics: Diagnostics,
}

/// Runs classify → layout → geometry → color, plus aggregation, over a whole dataset.
///
/// Slot assignments are cached across runs and reused while the classified dataset is
/// unchanged, so resizing (`set_viewport` + `run`) never reorders individuals.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: PipelineConfig,
    registry: LaneRegistry,
    cache: PositionCache,
}

impl Engine {
    pub fn new(config: PipelineConfig) -> Self {
        let registry = config.registry();
        Self {
            config,
            registry,
            cache: PositionCache::new(),
        }
    }

    /// Pins "now" so runs are reproducible. `None` falls back to today's local date.
    pub fn with_fixed_now(mut self, now: Option<NaiveDate>) -> Self {
        self.config.classify.now = now;
        self
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.set_viewport(width, height);
        self
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.config.viewport.width = width;
        self.config.viewport.height = height;
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &LaneRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    /// Classification only.
    pub fn classify(&self, records: &[RawRecord], diagnostics: &mut Diagnostics) -> Vec<Individual> {
        classify_all(records, &self.config.classify, diagnostics)
    }

    /// Runs the pipeline over already-ingested records, keeping the ingest diagnostics in front.
    pub fn run_ingested(&mut self, ingested: Ingested) -> PipelineResult<PipelineOutput> {
        let mut out = self.run(&ingested.records)?;
        let mut diagnostics = ingested.diagnostics;
        diagnostics.append(out.diagnostics);
        out.diagnostics = diagnostics;
        Ok(out)
    }

    pub fn run(&mut self, records: &[RawRecord]) -> PipelineResult<PipelineOutput> {
        let cfg = &self.config;
        cfg.classify.validate()?;
        cfg.viewport.validate(cfg.layout.margin_top)?;
        let scale = TimeScale::new(
            cfg.classify.start_instant(),
            cfg.classify.now_instant(),
            cfg.viewport.x_start(),
            cfg.viewport.x_now(),
        )?;

        let mut diagnostics = Diagnostics::new();
        let individuals = classify_all(records, &cfg.classify, &mut diagnostics);
        tracing::debug!(individuals = individuals.len(), "classified");

        let slots = self.cache.slots(&individuals, &self.registry);
        let lanes = LaneLayoutManager::new(&self.registry, &cfg.layout).layout(
            slots,
            cfg.viewport.drawable_height(cfg.layout.margin_top),
            &mut diagnostics,
        );

        let paths = PathGeometryEngine::new(&cfg.geometry, &scale, &lanes, slots, &self.registry)
            .build_all(&individuals, &mut diagnostics);

        let mapper = GradientColorMapper::new(&cfg.palette, &self.registry);
        let mut outputs = Vec::with_capacity(individuals.len());
        for (ind, path) in individuals.iter().zip(paths) {
            let color_stops = mapper.stops(&path, ind, &mut diagnostics);
            outputs.push(IndividualOutput {
                id: ind.id.clone(),
                initial_lane: ind.initial_lane,
                final_lane: ind.final_lane,
                lane_position: slots.slot(&ind.id, ind.final_lane),
                journey_type: ind.journey_type,
                events: ind.events.clone(),
                path_data: path_data(&path),
                path,
                color_stops,
            });
        }

        let flow = AggregationEngine::new(&cfg.flow, &self.registry).aggregate(&individuals, &mut diagnostics);
        let summary = Summary::from_individuals(&individuals, &self.registry);

        let lane_outputs = lanes
            .lanes
            .iter()
            .map(|layout| LaneOutput {
                layout: layout.clone(),
                members: slots.members(layout.id).to_vec(),
            })
            .collect();

        tracing::debug!(
            diagnostics = diagnostics.len(),
            geometry = diagnostics.for_stage(Stage::Geometry).count(),
            "pipeline finished"
        );
        Ok(PipelineOutput {
            timeline: scale,
            total_height: lanes.total_height,
            individuals: outputs,
            lanes: lane_outputs,
            flow,
            summary,
            diagnostics,
        })
    }
}

impl From<PipelineConfig> for Engine {
    fn from(config: PipelineConfig) -> Self {
        Self::new(config)
    }
}

