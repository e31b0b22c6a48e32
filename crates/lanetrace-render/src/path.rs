//! Individual journeys → continuous paths of horizontal runs and rounded lane transitions.
//!
//! A path starts at the timeline start in the individual's start lane and ends at "now" in its
//! final lane. Each transition is drawn as two opposite quarter turns joined by a vertical run,
//! finishing exactly at the event's x and never beyond it. Transitions sharing a calendar date
//! get growing radii so that they nest instead of overlapping.

use crate::geom::{Point, point};
use crate::layout::SlotTable;
use crate::model::{LaneLayoutSet, PathDescriptor, Segment};
use crate::scale::TimeScale;
use chrono::{NaiveDate, NaiveDateTime};
use lanetrace_core::{Diagnostics, EventKind, Individual, LaneId, LaneRegistry, Stage};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub base_radius: f64,
    /// Radius growth per rank among same-day transitions.
    pub rank_step: f64,
    /// How far (toward "now") a non-finite x is moved from the last good point.
    pub fallback_offset: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            base_radius: 6.0,
            rank_step: 0.3,
            fallback_offset: 1.0,
        }
    }
}

impl GeometryConfig {
    pub fn radius_for_rank(&self, rank: usize) -> f64 {
        self.base_radius * (1.0 + self.rank_step * rank as f64)
    }
}

/// Rank of each transition among all transitions on the same calendar date, keyed by
/// `(individual id, event index)`, plus a per-day factor that shrinks the whole radius ladder
/// when the day sits too close to the timeline start for the largest rank.
#[derive(Debug, Clone, Default)]
pub struct TransitionRanks {
    ranks: FxHashMap<(String, usize), usize>,
    ladder_scale: FxHashMap<NaiveDate, f64>,
}

impl TransitionRanks {
    pub fn rank(&self, id: &str, event: usize) -> Option<usize> {
        self.ranks.get(&(id.to_string(), event)).copied()
    }

    /// In `(0, 1]`; 1 when the unscaled ladder fits.
    pub fn ladder_scale(&self, day: NaiveDate) -> f64 {
        self.ladder_scale.get(&day).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

#[derive(Debug)]
pub struct PathGeometryEngine<'a> {
    cfg: &'a GeometryConfig,
    scale: &'a TimeScale,
    lanes: &'a LaneLayoutSet,
    slots: &'a SlotTable,
    registry: &'a LaneRegistry,
}

impl<'a> PathGeometryEngine<'a> {
    pub fn new(
        cfg: &'a GeometryConfig,
        scale: &'a TimeScale,
        lanes: &'a LaneLayoutSet,
        slots: &'a SlotTable,
        registry: &'a LaneRegistry,
    ) -> Self {
        Self {
            cfg,
            scale,
            lanes,
            slots,
            registry,
        }
    }

    pub fn transition_ranks(&self, individuals: &[Individual]) -> TransitionRanks {
        struct Entry<'i> {
            priority: u32,
            slot: usize,
            id: &'i str,
            event: usize,
            at: NaiveDateTime,
        }

        let mut by_day: FxHashMap<NaiveDate, Vec<Entry<'_>>> = FxHashMap::default();
        for ind in individuals {
            for (event, e) in ind.events.iter().enumerate() {
                if e.kind == EventKind::Entered {
                    continue;
                }
                by_day.entry(e.timestamp.date()).or_default().push(Entry {
                    priority: self.registry.priority(e.lane),
                    slot: self.slots.slot(&ind.id, e.lane).unwrap_or(usize::MAX),
                    id: &ind.id,
                    event,
                    at: e.timestamp,
                });
            }
        }

        let mut ranks = TransitionRanks::default();
        for (day, entries) in by_day.iter_mut() {
            entries.sort_by(|a, b| {
                (a.priority, a.slot, a.id, a.event).cmp(&(b.priority, b.slot, b.id, b.event))
            });
            for (rank, e) in entries.iter().enumerate() {
                ranks.ranks.insert((e.id.to_string(), e.event), rank);
            }

            // The earliest transition of the day has the least room before it.
            let Some(earliest) = entries.iter().map(|e| e.at).min() else {
                continue;
            };
            let room = (self.scale.x_start - self.scale.x_clamped(earliest).0) / 2.0;
            let top = self.cfg.radius_for_rank(entries.len() - 1);
            if room.is_finite() && room > 0.0 && top > room {
                ranks.ladder_scale.insert(*day, room / top);
            }
        }
        ranks
    }

    pub fn build_all(&self, individuals: &[Individual], diagnostics: &mut Diagnostics) -> Vec<PathDescriptor> {
        let ranks = self.transition_ranks(individuals);
        let out: Vec<PathDescriptor> = individuals
            .iter()
            .map(|ind| self.build(ind, &ranks, diagnostics))
            .collect();
        tracing::debug!(paths = out.len(), "built paths");
        out
    }

    fn lane_y(&self, id: &str, lane: LaneId) -> Option<f64> {
        let slot = self.slots.slot(id, lane)?;
        self.lanes.y_for(lane, slot)
    }

    /// Replaces non-finite coordinates: x steps `fallback_offset` toward "now" from the last
    /// good point, y keeps the last good y.
    fn sanitize(
        &self,
        x: f64,
        y: Option<f64>,
        last_good: Point,
        id: &str,
        what: &str,
        diagnostics: &mut Diagnostics,
    ) -> Point {
        let y = y.unwrap_or(f64::NAN);
        if x.is_finite() && y.is_finite() {
            return point(x, y);
        }
        diagnostics.push(
            Stage::Geometry,
            Some(id),
            format!("non-finite {what} coordinate ({x}, {y}); used fallback"),
        );
        let fx = if x.is_finite() {
            x
        } else {
            (last_good.x - self.cfg.fallback_offset).max(self.scale.x_now)
        };
        let fy = if y.is_finite() { y } else { last_good.y };
        point(fx, fy)
    }

    pub fn build(
        &self,
        ind: &Individual,
        ranks: &TransitionRanks,
        diagnostics: &mut Diagnostics,
    ) -> PathDescriptor {
        let id = ind.id.as_str();
        let start_lane = ind.start_lane();
        let origin = point(self.scale.x_start, self.lanes.lane(start_lane).map_or(0.0, |l| l.y_start));
        let mut cur = self.sanitize(
            self.scale.x_start,
            self.lane_y(id, start_lane),
            origin,
            id,
            "start",
            diagnostics,
        );

        let mut segments = Vec::with_capacity(2 * ind.events.len() + 1);
        for (idx, e) in ind.events.iter().enumerate() {
            if e.kind == EventKind::Entered {
                continue;
            }
            let (raw_x, clamped) = self.scale.x_clamped(e.timestamp);
            if clamped {
                diagnostics.push(
                    Stage::Geometry,
                    Some(id),
                    format!("event at {} lies outside the timeline; clamped", e.timestamp),
                );
            }
            let target = self.sanitize(raw_x, self.lane_y(id, e.lane), cur, id, "transition", diagnostics);
            // Never step back in time.
            let x = target.x.min(cur.x);
            let y1 = target.y;

            let rank = ranks.rank(id, idx).unwrap_or(0);
            let dy = (y1 - cur.y).abs();
            let room = cur.x - x;
            let r = (self.cfg.radius_for_rank(rank) * ranks.ladder_scale(e.timestamp.date()))
                .min(dy / 2.0)
                .min(room / 2.0)
                .max(0.0);

            segments.push(Segment::Horizontal {
                x0: cur.x,
                x1: x + 2.0 * r,
                y: cur.y,
            });
            segments.push(Segment::Transition {
                x,
                y0: cur.y,
                y1,
                turn_radius: r,
                to_lane: e.lane,
                event_kind: e.kind,
                at: e.timestamp,
            });
            cur = point(x, y1);
        }
        segments.push(Segment::Horizontal {
            x0: cur.x,
            x1: self.scale.x_now,
            y: cur.y,
        });

        PathDescriptor {
            individual_id: ind.id.clone(),
            segments,
        }
    }
}
