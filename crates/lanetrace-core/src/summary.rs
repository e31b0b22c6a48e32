use crate::classify::{Individual, JourneyType};
use crate::lane::{LaneId, LaneRegistry};
use indexmap::IndexMap;
use serde::Serialize;

/// Per-status tallies over one classified dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_journey: IndexMap<JourneyType, usize>,
    pub by_final_lane: IndexMap<LaneId, usize>,
    pub still_held_living: usize,
    pub still_held_deceased: usize,
}

impl Summary {
    pub fn from_individuals(individuals: &[Individual], lanes: &LaneRegistry) -> Self {
        let mut by_journey: IndexMap<JourneyType, usize> =
            JourneyType::ALL.iter().map(|j| (*j, 0)).collect();
        let mut by_final_lane: IndexMap<LaneId, usize> =
            lanes.sorted().into_iter().map(|l| (l.id, 0)).collect();
        for ind in individuals {
            *by_journey.entry(ind.journey_type).or_insert(0) += 1;
            *by_final_lane.entry(ind.final_lane).or_insert(0) += 1;
        }
        let count = |lane| by_final_lane.get(&lane).copied().unwrap_or(0);
        let still_held_living = count(LaneId::StillHeldLiving);
        let still_held_deceased = count(LaneId::StillHeldDeceased) + count(LaneId::DeceasedAtStart);
        Self {
            total: individuals.len(),
            by_journey,
            by_final_lane,
            still_held_living,
            still_held_deceased,
        }
    }
}
