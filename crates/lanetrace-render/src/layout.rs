//! Lane heights and per-individual vertical slots.
//!
//! Every lane an individual's path visits reserves one slot for it. Slots inside a lane are
//! ordered resolved-before-still-held, then by resolution time, then by id, so the layout is a
//! pure function of the classified dataset.

use crate::model::{LaneLayout, LaneLayoutSet};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use lanetrace_core::{Diagnostics, Individual, LaneId, LaneRegistry, Section, Stage};
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub stroke_width: f64,
    pub line_spacing: f64,
    /// Compression never pushes spacing below this floor.
    pub min_line_spacing: f64,
    pub lane_padding: f64,
    pub min_lane_height: f64,
    pub lane_gap: f64,
    pub margin_top: f64,
    /// Fraction of the drawable height allotted to each section.
    pub section_shares: IndexMap<Section, f64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let mut section_shares = IndexMap::new();
        section_shares.insert(Section::Released, 0.5);
        section_shares.insert(Section::Captive, 0.45);
        section_shares.insert(Section::Start, 0.05);
        Self {
            stroke_width: 2.0,
            line_spacing: 3.0,
            min_line_spacing: 0.5,
            lane_padding: 6.0,
            min_lane_height: 24.0,
            lane_gap: 10.0,
            margin_top: 20.0,
            section_shares,
        }
    }
}

impl LayoutConfig {
    /// `count × (stroke + spacing) + 2 × padding`, floored at the minimum lane height.
    pub fn lane_height(&self, count: usize, spacing: f64) -> f64 {
        let needed = count as f64 * (self.stroke_width + spacing) + 2.0 * self.lane_padding;
        needed.max(self.min_lane_height)
    }
}

/// In-lane ordering: resolved first, earliest resolution first, then id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    still_held: bool,
    unresolved: bool,
    resolved_at: Option<NaiveDateTime>,
    id: String,
}

impl SlotKey {
    pub fn of(ind: &Individual) -> Self {
        let resolved_at = ind.resolved_at();
        Self {
            still_held: ind.is_still_held(),
            unresolved: resolved_at.is_none(),
            resolved_at,
            id: ind.id.clone(),
        }
    }
}

/// Slot assignments for one dataset: lane → ordered ids, and id → (lane, slot) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotTable {
    by_lane: IndexMap<LaneId, Vec<String>>,
    by_id: FxHashMap<String, Vec<(LaneId, usize)>>,
}

impl SlotTable {
    pub fn build(individuals: &[Individual], registry: &LaneRegistry) -> Self {
        let keys: FxHashMap<&str, SlotKey> = individuals
            .iter()
            .map(|i| (i.id.as_str(), SlotKey::of(i)))
            .collect();
        let mut by_lane = registry.members(individuals);
        for ids in by_lane.values_mut() {
            ids.sort_by(|a, b| keys.get(a.as_str()).cmp(&keys.get(b.as_str())));
        }

        let mut by_id: FxHashMap<String, Vec<(LaneId, usize)>> = FxHashMap::default();
        for (lane, ids) in &by_lane {
            for (slot, id) in ids.iter().enumerate() {
                by_id.entry(id.clone()).or_default().push((*lane, slot));
            }
        }
        Self { by_lane, by_id }
    }

    pub fn slot(&self, id: &str, lane: LaneId) -> Option<usize> {
        self.by_id
            .get(id)?
            .iter()
            .find(|(l, _)| *l == lane)
            .map(|(_, slot)| *slot)
    }

    pub fn members(&self, lane: LaneId) -> &[String] {
        self.by_lane.get(&lane).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, lane: LaneId) -> usize {
        self.members(lane).len()
    }
}

/// Slot table reused across passes while the classified dataset is unchanged.
#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    fingerprint: Option<u64>,
    table: SlotTable,
    rebuilds: usize,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fingerprint(individuals: &[Individual]) -> u64 {
        let mut h = FxHasher::default();
        individuals.len().hash(&mut h);
        for ind in individuals {
            ind.id.hash(&mut h);
            ind.visited_lanes().hash(&mut h);
            SlotKey::of(ind).hash(&mut h);
        }
        h.finish()
    }

    /// Returns the cached table, rebuilding it wholesale if the dataset changed.
    pub fn slots(&mut self, individuals: &[Individual], registry: &LaneRegistry) -> &SlotTable {
        let fp = Self::fingerprint(individuals);
        if self.fingerprint != Some(fp) {
            self.table = SlotTable::build(individuals, registry);
            self.fingerprint = Some(fp);
            self.rebuilds += 1;
            tracing::debug!(individuals = individuals.len(), "rebuilt lane positions");
        }
        &self.table
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub fn clear(&mut self) {
        self.fingerprint = None;
        self.table = SlotTable::default();
    }
}

#[derive(Debug)]
pub struct LaneLayoutManager<'a> {
    registry: &'a LaneRegistry,
    cfg: &'a LayoutConfig,
}

impl<'a> LaneLayoutManager<'a> {
    pub fn new(registry: &'a LaneRegistry, cfg: &'a LayoutConfig) -> Self {
        Self { registry, cfg }
    }

    /// Stacks lanes in priority order from `margin_top`. `drawable_height` is split between
    /// sections by `section_shares`; a section that needs more than its share has its line
    /// spacing compressed, never below `min_line_spacing`.
    pub fn layout(
        &self,
        slots: &SlotTable,
        drawable_height: f64,
        diagnostics: &mut Diagnostics,
    ) -> LaneLayoutSet {
        let cfg = self.cfg;
        let lanes = self.registry.sorted();

        let mut spacing_by_section: FxHashMap<Section, f64> = FxHashMap::default();
        for (section, share) in &cfg.section_shares {
            let in_section: Vec<LaneId> = lanes
                .iter()
                .filter(|l| l.section == *section)
                .map(|l| l.id)
                .collect();
            let spacing = self.section_spacing(
                *section,
                &in_section,
                slots,
                drawable_height * share,
                diagnostics,
            );
            spacing_by_section.insert(*section, spacing);
        }

        let mut y = cfg.margin_top;
        let mut out = Vec::with_capacity(lanes.len());
        for spec in lanes {
            let count = slots.count(spec.id);
            let spacing = spacing_by_section
                .get(&spec.section)
                .copied()
                .unwrap_or(cfg.line_spacing);
            let height = cfg.lane_height(count, spacing);
            out.push(LaneLayout {
                id: spec.id,
                label: spec.label.clone(),
                priority: spec.priority,
                section: spec.section,
                color: spec.color.clone(),
                y_start: y,
                height,
                member_count: count,
                spacing,
            });
            y += height + cfg.lane_gap;
        }
        let total_height = (y - cfg.lane_gap).max(cfg.margin_top);
        tracing::debug!(lanes = out.len(), total_height, "laid out lanes");

        LaneLayoutSet {
            lanes: out,
            stroke_width: cfg.stroke_width,
            padding: cfg.lane_padding,
            total_height,
        }
    }

    fn section_spacing(
        &self,
        section: Section,
        lanes: &[LaneId],
        slots: &SlotTable,
        allotted: f64,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        let cfg = self.cfg;
        let lines: usize = lanes.iter().map(|l| slots.count(*l)).sum();
        let required: f64 = lanes
            .iter()
            .map(|l| cfg.lane_height(slots.count(*l), cfg.line_spacing))
            .sum::<f64>()
            + cfg.lane_gap * lanes.len().saturating_sub(1) as f64;
        if lines == 0 || required <= allotted {
            return cfg.line_spacing;
        }

        let fixed = lanes.len() as f64 * 2.0 * cfg.lane_padding
            + cfg.lane_gap * lanes.len().saturating_sub(1) as f64;
        let fitted = (allotted - fixed) / lines as f64 - cfg.stroke_width;
        let spacing = fitted.min(cfg.line_spacing).max(cfg.min_line_spacing);
        if fitted < cfg.min_line_spacing || !fitted.is_finite() {
            diagnostics.push(
                Stage::Layout,
                None,
                format!(
                    "{section:?} section needs {required:.1}px but has {allotted:.1}px; spacing held at floor {spacing}"
                ),
            );
        }
        spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanetrace_core::{ClassifyConfig, RawRecord, classify_all};

    fn individuals(n_held: usize, n_released: usize) -> Vec<Individual> {
        let cfg = ClassifyConfig::default()
            .with_fixed_now(chrono::NaiveDate::from_ymd_opt(2025, 10, 18));
        let mut records = Vec::new();
        for i in 0..n_held {
            records.push(RawRecord::new(format!("held-{i:03}")).status("Held in Gaza"));
        }
        for i in 0..n_released {
            records.push(
                RawRecord::new(format!("rel-{i:03}"))
                    .status("Released")
                    .circumstances("deal")
                    .release_date(&format!("2023-11-{:02}", 24 + (i % 6))),
            );
        }
        let mut d = Diagnostics::new();
        classify_all(&records, &cfg, &mut d)
    }

    #[test]
    fn height_is_monotone_in_member_count() {
        let cfg = LayoutConfig::default();
        let mut prev = 0.0;
        for n in 0..200 {
            let h = cfg.lane_height(n, cfg.line_spacing);
            assert!(h >= prev);
            prev = h;
        }
    }

    #[test]
    fn resolved_individuals_take_top_slots_in_date_order() {
        let inds = individuals(2, 3);
        let table = SlotTable::build(&inds, &LaneRegistry::default());
        // Everyone passes through still-held-living; the released ones come first.
        let order = table.members(LaneId::StillHeldLiving);
        assert_eq!(order, ["rel-000", "rel-001", "rel-002", "held-000", "held-001"]);
        assert_eq!(table.slot("rel-002", LaneId::ReleasedDealLiving), Some(2));
        assert_eq!(table.slot("held-001", LaneId::ReleasedDealLiving), None);
    }

    #[test]
    fn cache_reuses_table_until_the_dataset_changes() {
        let reg = LaneRegistry::default();
        let inds = individuals(3, 2);
        let mut cache = PositionCache::new();
        let first = cache.slots(&inds, &reg).clone();
        let again = cache.slots(&inds, &reg).clone();
        assert_eq!(first, again);
        assert_eq!(cache.rebuilds(), 1);

        let more = individuals(4, 2);
        cache.slots(&more, &reg);
        assert_eq!(cache.rebuilds(), 2);
    }

    #[test]
    fn crowded_section_compresses_spacing_down_to_floor() {
        let reg = LaneRegistry::default();
        let cfg = LayoutConfig::default();
        let inds = individuals(0, 120);
        let table = SlotTable::build(&inds, &reg);
        let mgr = LaneLayoutManager::new(&reg, &cfg);

        let mut d = Diagnostics::new();
        let roomy = mgr.layout(&table, 10_000.0, &mut d);
        assert_eq!(roomy.lane(LaneId::ReleasedDealLiving).unwrap().spacing, cfg.line_spacing);
        assert!(d.is_empty());

        let tight = mgr.layout(&table, 1200.0, &mut d);
        let spacing = tight.lane(LaneId::ReleasedDealLiving).unwrap().spacing;
        assert!(spacing < cfg.line_spacing && spacing >= cfg.min_line_spacing);

        let cramped = mgr.layout(&table, 100.0, &mut d);
        assert_eq!(
            cramped.lane(LaneId::ReleasedDealLiving).unwrap().spacing,
            cfg.min_line_spacing
        );
        assert!(d.for_stage(Stage::Layout).count() >= 1);
    }

    #[test]
    fn lanes_stack_in_priority_order_without_overlap() {
        let reg = LaneRegistry::default();
        let cfg = LayoutConfig::default();
        let inds = individuals(5, 5);
        let table = SlotTable::build(&inds, &reg);
        let mut d = Diagnostics::new();
        let set = LaneLayoutManager::new(&reg, &cfg).layout(&table, 800.0, &mut d);
        for pair in set.lanes.windows(2) {
            assert!(pair[0].priority <= pair[1].priority);
            assert!(pair[0].y_start + pair[0].height <= pair[1].y_start);
        }
        let y0 = set.y_for(LaneId::StillHeldLiving, 0).unwrap();
        let y1 = set.y_for(LaneId::StillHeldLiving, 1).unwrap();
        assert_eq!(y1 - y0, cfg.stroke_width + cfg.line_spacing);
    }
}
