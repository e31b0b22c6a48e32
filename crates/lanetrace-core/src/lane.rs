//! The fixed set of display lanes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LaneId {
    ReleasedDealLiving,
    ReleasedMilitaryLiving,
    ReleasedDealDeceased,
    ReleasedMilitaryDeceased,
    StillHeldLiving,
    StillHeldDeceased,
    DeceasedAtStart,
    AliveAtStart,
}

impl LaneId {
    pub const ALL: [LaneId; 8] = [
        LaneId::ReleasedDealLiving,
        LaneId::ReleasedMilitaryLiving,
        LaneId::ReleasedDealDeceased,
        LaneId::ReleasedMilitaryDeceased,
        LaneId::StillHeldLiving,
        LaneId::StillHeldDeceased,
        LaneId::DeceasedAtStart,
        LaneId::AliveAtStart,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LaneId::ReleasedDealLiving => "released-deal-living",
            LaneId::ReleasedMilitaryLiving => "released-military-living",
            LaneId::ReleasedDealDeceased => "released-deal-deceased",
            LaneId::ReleasedMilitaryDeceased => "released-military-deceased",
            LaneId::StillHeldLiving => "still-held-living",
            LaneId::StillHeldDeceased => "still-held-deceased",
            LaneId::DeceasedAtStart => "deceased-at-start",
            LaneId::AliveAtStart => "alive-at-start",
        }
    }

    pub fn vitality(self) -> Vitality {
        match self {
            LaneId::ReleasedDealLiving
            | LaneId::ReleasedMilitaryLiving
            | LaneId::StillHeldLiving
            | LaneId::AliveAtStart => Vitality::Living,
            LaneId::ReleasedDealDeceased
            | LaneId::ReleasedMilitaryDeceased
            | LaneId::StillHeldDeceased
            | LaneId::DeceasedAtStart => Vitality::Deceased,
        }
    }

    pub fn section(self) -> Section {
        match self {
            LaneId::ReleasedDealLiving
            | LaneId::ReleasedMilitaryLiving
            | LaneId::ReleasedDealDeceased
            | LaneId::ReleasedMilitaryDeceased => Section::Released,
            LaneId::StillHeldLiving | LaneId::StillHeldDeceased | LaneId::DeceasedAtStart => {
                Section::Captive
            }
            LaneId::AliveAtStart => Section::Start,
        }
    }

    pub fn is_released(self) -> bool {
        self.section() == Section::Released
    }

    pub fn release_method(self) -> Option<ReleaseMethod> {
        match self {
            LaneId::ReleasedDealLiving | LaneId::ReleasedDealDeceased => {
                Some(ReleaseMethod::Negotiated)
            }
            LaneId::ReleasedMilitaryLiving | LaneId::ReleasedMilitaryDeceased => {
                Some(ReleaseMethod::Military)
            }
            _ => None,
        }
    }

    /// The lane an individual moves to when they die while occupying `self`.
    pub fn deceased_counterpart(self) -> LaneId {
        match self {
            LaneId::AliveAtStart | LaneId::StillHeldLiving => LaneId::StillHeldDeceased,
            LaneId::ReleasedDealLiving => LaneId::ReleasedDealDeceased,
            LaneId::ReleasedMilitaryLiving => LaneId::ReleasedMilitaryDeceased,
            other => other,
        }
    }

    pub fn release_lane(method: ReleaseMethod, vitality: Vitality) -> LaneId {
        match (method, vitality) {
            (ReleaseMethod::Negotiated, Vitality::Living) => LaneId::ReleasedDealLiving,
            (ReleaseMethod::Military, Vitality::Living) => LaneId::ReleasedMilitaryLiving,
            (ReleaseMethod::Negotiated, Vitality::Deceased) => LaneId::ReleasedDealDeceased,
            (ReleaseMethod::Military, Vitality::Deceased) => LaneId::ReleasedMilitaryDeceased,
        }
    }
}

impl std::fmt::Display for LaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Released,
    Captive,
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Vitality {
    Living,
    Deceased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseMethod {
    Military,
    Negotiated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSpec {
    pub id: LaneId,
    pub label: String,
    pub priority: u32,
    pub section: Section,
    pub vitality: Vitality,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneRegistry {
    lanes: Vec<LaneSpec>,
}

impl Default for LaneRegistry {
    fn default() -> Self {
        let spec = |id: LaneId, priority: u32, label: &str, color: &str| LaneSpec {
            id,
            label: label.to_string(),
            priority,
            section: id.section(),
            vitality: id.vitality(),
            color: color.to_string(),
        };
        Self {
            lanes: vec![
                spec(LaneId::ReleasedDealLiving, 0, "Released in deals", "#22C55E"),
                spec(
                    LaneId::ReleasedMilitaryLiving,
                    1,
                    "Rescued by military operation",
                    "#3B82F6",
                ),
                spec(
                    LaneId::ReleasedDealDeceased,
                    2,
                    "Bodies returned in deals",
                    "#A855F7",
                ),
                spec(
                    LaneId::ReleasedMilitaryDeceased,
                    3,
                    "Bodies recovered by military operation",
                    "#7C3AED",
                ),
                spec(LaneId::StillHeldLiving, 4, "Still held, alive", "#FF2D2D"),
                spec(
                    LaneId::StillHeldDeceased,
                    5,
                    "Killed in captivity, body held",
                    "#F87171",
                ),
                spec(
                    LaneId::DeceasedAtStart,
                    6,
                    "Killed before/during abduction, body held",
                    "#6B7280",
                ),
                spec(LaneId::AliveAtStart, 7, "Abducted alive", "#DC2626"),
            ],
        }
    }
}

impl LaneRegistry {
    pub fn get(&self, id: LaneId) -> &LaneSpec {
        // `lanes` is built in `LaneId::ALL` order and never reordered.
        &self.lanes[id as usize]
    }

    pub fn priority(&self, id: LaneId) -> u32 {
        self.get(id).priority
    }

    /// Lanes in display order (ascending priority, ties by id).
    pub fn sorted(&self) -> Vec<&LaneSpec> {
        let mut out: Vec<&LaneSpec> = self.lanes.iter().collect();
        out.sort_by_key(|l| (l.priority, l.id));
        out
    }

    pub fn with_label(mut self, id: LaneId, label: impl Into<String>) -> Self {
        if let Some(l) = self.lanes.iter_mut().find(|l| l.id == id) {
            l.label = label.into();
        }
        self
    }

    pub fn with_priority(mut self, id: LaneId, priority: u32) -> Self {
        if let Some(l) = self.lanes.iter_mut().find(|l| l.id == id) {
            l.priority = priority;
        }
        self
    }

    /// Rebuilds lane membership from scratch: every lane an individual's path visits, in
    /// display order, with ids in input order. Lanes nobody visits are present but empty.
    pub fn members<'a>(
        &self,
        individuals: impl IntoIterator<Item = &'a crate::classify::Individual>,
    ) -> IndexMap<LaneId, Vec<String>> {
        let mut out: IndexMap<LaneId, Vec<String>> =
            self.sorted().into_iter().map(|l| (l.id, Vec::new())).collect();
        for ind in individuals {
            for lane in ind.visited_lanes() {
                if let Some(ids) = out.get_mut(&lane) {
                    ids.push(ind.id.clone());
                }
            }
        }
        out
    }

    /// Final-lane membership (the lane each individual ends in), in display order.
    pub fn final_members<'a>(
        &self,
        individuals: impl IntoIterator<Item = &'a crate::classify::Individual>,
    ) -> IndexMap<LaneId, Vec<String>> {
        let mut out: IndexMap<LaneId, Vec<String>> =
            self.sorted().into_iter().map(|l| (l.id, Vec::new())).collect();
        for ind in individuals {
            if let Some(ids) = out.get_mut(&ind.final_lane) {
                ids.push(ind.id.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_lane_once_in_priority_order() {
        let reg = LaneRegistry::default();
        let ids: Vec<LaneId> = reg.sorted().iter().map(|l| l.id).collect();
        assert_eq!(ids, LaneId::ALL.to_vec());
        for id in LaneId::ALL {
            assert_eq!(reg.get(id).id, id);
            assert_eq!(reg.get(id).section, id.section());
        }
    }

    #[test]
    fn deceased_counterparts_stay_within_section_or_leave_start() {
        assert_eq!(
            LaneId::StillHeldLiving.deceased_counterpart(),
            LaneId::StillHeldDeceased
        );
        assert_eq!(
            LaneId::AliveAtStart.deceased_counterpart(),
            LaneId::StillHeldDeceased
        );
        assert_eq!(
            LaneId::ReleasedMilitaryLiving.deceased_counterpart(),
            LaneId::ReleasedMilitaryDeceased
        );
        for id in LaneId::ALL {
            assert_eq!(id.deceased_counterpart().vitality(), Vitality::Deceased);
        }
    }

    #[test]
    fn release_lane_matches_method_and_vitality() {
        for method in [ReleaseMethod::Military, ReleaseMethod::Negotiated] {
            for vitality in [Vitality::Living, Vitality::Deceased] {
                let lane = LaneId::release_lane(method, vitality);
                assert!(lane.is_released());
                assert_eq!(lane.release_method(), Some(method));
                assert_eq!(lane.vitality(), vitality);
            }
        }
    }

    #[test]
    fn priority_override_reorders_display() {
        let reg = LaneRegistry::default().with_priority(LaneId::StillHeldLiving, 0);
        assert_eq!(reg.sorted()[0].id, LaneId::StillHeldLiving);
        assert_eq!(reg.sorted()[1].id, LaneId::ReleasedDealLiving);
    }
}
