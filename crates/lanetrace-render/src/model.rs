use crate::geom::{Point, point};
use chrono::NaiveDateTime;
use lanetrace_core::{EventKind, LaneId, Section};
use serde::Serialize;
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneLayout {
    pub id: LaneId,
    pub label: String,
    pub priority: u32,
    pub section: Section,
    pub color: String,
    pub y_start: f64,
    pub height: f64,
    pub member_count: usize,
    /// Inter-line spacing after section compression.
    pub spacing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneLayoutSet {
    pub lanes: Vec<LaneLayout>,
    pub stroke_width: f64,
    pub padding: f64,
    pub total_height: f64,
}

impl LaneLayoutSet {
    pub fn lane(&self, id: LaneId) -> Option<&LaneLayout> {
        self.lanes.iter().find(|l| l.id == id)
    }

    /// Centre line of slot `slot` in lane `id`.
    pub fn y_for(&self, id: LaneId, slot: usize) -> Option<f64> {
        let lane = self.lane(id)?;
        Some(
            lane.y_start
                + self.padding
                + slot as f64 * (self.stroke_width + lane.spacing)
                + self.stroke_width / 2.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Segment {
    Horizontal {
        x0: f64,
        x1: f64,
        y: f64,
    },
    /// Two opposite quarter turns joined by a vertical run. Enters at `x + 2r` on `y0`, runs
    /// vertically at `x + r`, and reaches `y1` exactly at `x`.
    Transition {
        x: f64,
        y0: f64,
        y1: f64,
        turn_radius: f64,
        to_lane: LaneId,
        event_kind: EventKind,
        at: NaiveDateTime,
    },
}

impl Segment {
    pub fn start_point(&self) -> Point {
        match *self {
            Segment::Horizontal { x0, y, .. } => point(x0, y),
            Segment::Transition {
                x, y0, turn_radius, ..
            } => point(x + 2.0 * turn_radius, y0),
        }
    }

    pub fn end_point(&self) -> Point {
        match *self {
            Segment::Horizontal { x1, y, .. } => point(x1, y),
            Segment::Transition { x, y1, .. } => point(x, y1),
        }
    }

    pub fn length(&self) -> f64 {
        match *self {
            Segment::Horizontal { x0, x1, .. } => (x1 - x0).abs(),
            Segment::Transition {
                y0, y1, turn_radius, ..
            } => {
                let r = turn_radius.max(0.0);
                PI * r + ((y1 - y0).abs() - 2.0 * r).max(0.0)
            }
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, Segment::Transition { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathDescriptor {
    pub individual_id: String,
    pub segments: Vec<Segment>,
}

impl PathDescriptor {
    pub fn start_point(&self) -> Option<Point> {
        self.segments.first().map(Segment::start_point)
    }

    pub fn end_point(&self) -> Option<Point> {
        self.segments.last().map(Segment::end_point)
    }

    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(Segment::length).sum()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.segments.iter().filter(|s| s.is_transition())
    }

    pub fn turn_radii(&self) -> Vec<f64> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Transition { turn_radius, .. } => Some(*turn_radius),
                Segment::Horizontal { .. } => None,
            })
            .collect()
    }

    /// Each segment starts where the previous one ends, within `tol`.
    pub fn is_continuous(&self, tol: f64) -> bool {
        self.segments
            .windows(2)
            .all(|w| crate::geom::approx_eq(w[0].end_point(), w[1].start_point(), tol))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorStop {
    pub offset_percent: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub source_lane: LaneId,
    pub target_lane: LaneId,
    pub value: usize,
    pub members: Vec<String>,
    pub width: f64,
    pub y0: f64,
    pub y1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubBuckets {
    pub living_count: usize,
    pub deceased_count: usize,
    pub living_proportion: f64,
    pub deceased_proportion: f64,
}

impl SubBuckets {
    pub fn new(living_count: usize, deceased_count: usize) -> Self {
        let total = (living_count + deceased_count) as f64;
        let (living_proportion, deceased_proportion) = if total > 0.0 {
            let living = living_count as f64 / total;
            (living, deceased_count as f64 / total)
        } else {
            (0.0, 0.0)
        };
        Self {
            living_count,
            deceased_count,
            living_proportion,
            deceased_proportion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub id: String,
    pub lane: LaneId,
    pub label: String,
    pub column: usize,
    pub value: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<SubBuckets>,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

/// A coarse outcome category spanning several terminal lanes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeGroup {
    pub id: String,
    pub label: String,
    pub lanes: Vec<LaneId>,
    pub value: usize,
    pub buckets: SubBuckets,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowGraph {
    pub width: f64,
    pub height: f64,
    pub node_width: f64,
    pub node_padding: f64,
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
    pub groups: Vec<OutcomeGroup>,
}

impl FlowGraph {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn link(&self, source: LaneId, target: LaneId) -> Option<&FlowLink> {
        self.links
            .iter()
            .find(|l| l.source_lane == source && l.target_lane == target)
    }

    pub fn group(&self, id: &str) -> Option<&OutcomeGroup> {
        self.groups.iter().find(|g| g.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_length_is_two_quarter_arcs_plus_vertical_run() {
        let seg = Segment::Transition {
            x: 100.0,
            y0: 0.0,
            y1: 50.0,
            turn_radius: 5.0,
            to_lane: LaneId::StillHeldDeceased,
            event_kind: EventKind::Died,
            at: chrono::NaiveDate::from_ymd_opt(2024, 1, 10)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        assert!((seg.length() - (PI * 5.0 + 40.0)).abs() < 1e-9);
        assert_eq!(seg.start_point(), point(110.0, 0.0));
        assert_eq!(seg.end_point(), point(100.0, 50.0));
    }

    #[test]
    fn sub_bucket_proportions_sum_to_one() {
        let b = SubBuckets::new(7, 3);
        assert!((b.living_proportion + b.deceased_proportion - 1.0).abs() < 1e-9);
        let empty = SubBuckets::new(0, 0);
        assert_eq!(empty.living_proportion, 0.0);
    }
}
