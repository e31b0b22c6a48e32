//! Start → outcome flow graph.
//!
//! Individuals sharing an `(initial lane, final lane)` pair form one link; nodes take their
//! value from their links. Node and link extents follow the usual sankey value scale: one `ky`
//! for the whole graph, nodes stacked per column and centered vertically.

use crate::f64_cmp;
use crate::model::{FlowGraph, FlowLink, FlowNode, OutcomeGroup, SubBuckets};
use indexmap::IndexMap;
use lanetrace_core::{Diagnostics, Individual, LaneId, LaneRegistry, Stage, Vitality};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub width: f64,
    pub height: f64,
    pub node_width: f64,
    pub node_padding: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
            node_width: 10.0,
            node_padding: 10.0,
        }
    }
}

const OUTCOME_GROUPS: &[(&str, &str, &[LaneId])] = &[
    (
        "released-deal",
        "Released in deals",
        &[LaneId::ReleasedDealLiving, LaneId::ReleasedDealDeceased],
    ),
    (
        "released-military",
        "Released by military operation",
        &[LaneId::ReleasedMilitaryLiving, LaneId::ReleasedMilitaryDeceased],
    ),
    (
        "still-held",
        "Still held",
        &[
            LaneId::StillHeldLiving,
            LaneId::StillHeldDeceased,
            LaneId::DeceasedAtStart,
        ],
    ),
];

pub fn start_node_id(lane: LaneId) -> String {
    format!("start:{lane}")
}

pub fn end_node_id(lane: LaneId) -> String {
    format!("end:{lane}")
}

#[derive(Debug)]
pub struct AggregationEngine<'a> {
    cfg: &'a FlowConfig,
    registry: &'a LaneRegistry,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(cfg: &'a FlowConfig, registry: &'a LaneRegistry) -> Self {
        Self { cfg, registry }
    }

    pub fn aggregate(&self, individuals: &[Individual], diagnostics: &mut Diagnostics) -> FlowGraph {
        let mut grouped: IndexMap<(LaneId, LaneId), Vec<String>> = IndexMap::new();
        for ind in individuals {
            grouped
                .entry((ind.initial_lane, ind.final_lane))
                .or_default()
                .push(ind.id.clone());
        }
        grouped.sort_by(|a, _, b, _| {
            let key = |(s, t): &(LaneId, LaneId)| {
                (self.registry.priority(*s), self.registry.priority(*t), *s, *t)
            };
            key(a).cmp(&key(b))
        });

        let mut links: Vec<FlowLink> = grouped
            .into_iter()
            .map(|((source_lane, target_lane), members)| FlowLink {
                source: start_node_id(source_lane),
                target: end_node_id(target_lane),
                source_lane,
                target_lane,
                value: members.len(),
                members,
                width: 0.0,
                y0: 0.0,
                y1: 0.0,
            })
            .collect();

        let mut nodes = self.nodes_from_links(&links);
        let groups = self.outcome_groups(&links, diagnostics);
        self.size(&mut nodes, &mut links);

        tracing::debug!(
            nodes = nodes.len(),
            links = links.len(),
            groups = groups.len(),
            "aggregated flow graph"
        );
        FlowGraph {
            width: self.cfg.width,
            height: self.cfg.height,
            node_width: self.cfg.node_width,
            node_padding: self.cfg.node_padding,
            nodes,
            links,
            groups,
        }
    }

    /// Source nodes (column 0) then terminal nodes (column 1), each in lane display order.
    fn nodes_from_links(&self, links: &[FlowLink]) -> Vec<FlowNode> {
        let mut nodes = Vec::new();
        for column in 0..2 {
            for spec in self.registry.sorted() {
                let value: usize = links
                    .iter()
                    .filter(|l| {
                        if column == 0 {
                            l.source_lane == spec.id
                        } else {
                            l.target_lane == spec.id
                        }
                    })
                    .map(|l| l.value)
                    .sum();
                if value == 0 {
                    continue;
                }
                let (id, buckets) = if column == 0 {
                    (start_node_id(spec.id), None)
                } else {
                    let buckets = match spec.vitality {
                        Vitality::Living => SubBuckets::new(value, 0),
                        Vitality::Deceased => SubBuckets::new(0, value),
                    };
                    (end_node_id(spec.id), Some(buckets))
                };
                nodes.push(FlowNode {
                    id,
                    lane: spec.id,
                    label: spec.label.clone(),
                    column,
                    value,
                    buckets,
                    x0: 0.0,
                    x1: 0.0,
                    y0: 0.0,
                    y1: 0.0,
                });
            }
        }
        nodes
    }

    fn outcome_groups(&self, links: &[FlowLink], diagnostics: &mut Diagnostics) -> Vec<OutcomeGroup> {
        let mut out = Vec::new();
        for (id, label, lanes) in OUTCOME_GROUPS {
            let mut living = 0;
            let mut deceased = 0;
            for link in links.iter().filter(|l| lanes.contains(&l.target_lane)) {
                match link.target_lane.vitality() {
                    Vitality::Living => living += link.value,
                    Vitality::Deceased => deceased += link.value,
                }
            }
            if living + deceased == 0 {
                continue;
            }
            let buckets = SubBuckets::new(living, deceased);
            let sum = buckets.living_proportion + buckets.deceased_proportion;
            if (sum - 1.0).abs() > 1e-6 {
                diagnostics.push(
                    Stage::Aggregate,
                    None,
                    format!("outcome group {id}: sub-bucket proportions sum to {sum}"),
                );
            }
            out.push(OutcomeGroup {
                id: (*id).to_string(),
                label: (*label).to_string(),
                lanes: lanes.to_vec(),
                value: living + deceased,
                buckets,
            });
        }
        out
    }

    fn size(&self, nodes: &mut [FlowNode], links: &mut [FlowLink]) {
        let height = self.cfg.height;
        let dx = self.cfg.node_width;
        let kx = (self.cfg.width - dx).max(0.0);

        let columns: Vec<Vec<usize>> = (0..2)
            .map(|c| {
                nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| n.column == c)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        let max_len = columns.iter().map(Vec::len).max().unwrap_or(0);
        let py = if max_len <= 1 {
            self.cfg.node_padding
        } else {
            self.cfg.node_padding.min(height / (max_len as f64 - 1.0))
        };

        let mut ky = f64::INFINITY;
        for col in &columns {
            let sum_values: f64 = col.iter().map(|&ni| nodes[ni].value as f64).sum();
            if sum_values <= 0.0 {
                continue;
            }
            let denom = height - (col.len() as f64 - 1.0) * py;
            ky = ky.min(denom / sum_values);
        }
        if !ky.is_finite() {
            ky = 0.0;
        }
        let ky = ky.max(0.0);

        for col in &columns {
            let mut y = 0.0;
            for &ni in col {
                let node = &mut nodes[ni];
                node.x0 = node.column as f64 * kx;
                node.x1 = node.x0 + dx;
                node.y0 = y;
                node.y1 = y + node.value as f64 * ky;
                y = node.y1 + py;
            }
            let n = col.len();
            if n > 0 {
                let offset = (height - y + py) / (n as f64 + 1.0);
                for (i, &ni) in col.iter().enumerate() {
                    let adj = offset * (i as f64 + 1.0);
                    nodes[ni].y0 += adj;
                    nodes[ni].y1 += adj;
                }
            }
        }

        for link in links.iter_mut() {
            link.width = link.value as f64 * ky;
        }

        // Bands leave each source ordered by target position and enter each target ordered
        // by source position.
        let y0_of = |id: &str| {
            nodes
                .iter()
                .find(|n| n.id == id)
                .map_or(0.0, |n| n.y0)
        };
        let mut order: Vec<usize> = (0..links.len()).collect();
        order.sort_by(|&a, &b| {
            f64_cmp(y0_of(&links[a].target), y0_of(&links[b].target)).then_with(|| a.cmp(&b))
        });
        let mut source_fill: IndexMap<String, f64> = IndexMap::new();
        for &li in &order {
            let top = y0_of(&links[li].source);
            let fill = source_fill.entry(links[li].source.clone()).or_insert(0.0);
            links[li].y0 = top + *fill + links[li].width / 2.0;
            *fill += links[li].width;
        }
        order.sort_by(|&a, &b| {
            f64_cmp(y0_of(&links[a].source), y0_of(&links[b].source)).then_with(|| a.cmp(&b))
        });
        let mut target_fill: IndexMap<String, f64> = IndexMap::new();
        for &li in &order {
            let top = y0_of(&links[li].target);
            let fill = target_fill.entry(links[li].target.clone()).or_insert(0.0);
            links[li].y1 = top + *fill + links[li].width / 2.0;
            *fill += links[li].width;
        }
    }
}
