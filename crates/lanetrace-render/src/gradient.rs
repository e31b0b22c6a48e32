//! Length-proportional gradient stops for individual paths.

use crate::model::{ColorStop, PathDescriptor, Segment};
use lanetrace_core::{Diagnostics, Individual, JourneyType, LaneRegistry, Stage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyPalette {
    pub start: String,
    pub intermediate: String,
    pub outcome: String,
}

impl JourneyPalette {
    fn new(start: &str, intermediate: &str, outcome: &str) -> Self {
        Self {
            start: start.to_string(),
            intermediate: intermediate.to_string(),
            outcome: outcome.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub dead_from_start: JourneyPalette,
    pub died_in_captivity: JourneyPalette,
    pub released_alive: JourneyPalette,
    pub released_body: JourneyPalette,
    pub still_captive: JourneyPalette,
    /// Take the outcome color from the final lane instead of the journey palette.
    pub outcome_from_final_lane: bool,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            dead_from_start: JourneyPalette::new("#6B7280", "#6B7280", "#A855F7"),
            died_in_captivity: JourneyPalette::new("#DC2626", "#F87171", "#F87171"),
            released_alive: JourneyPalette::new("#DC2626", "#DC2626", "#22C55E"),
            released_body: JourneyPalette::new("#DC2626", "#F87171", "#A855F7"),
            still_captive: JourneyPalette::new("#FF2D2D", "#FF2D2D", "#FF2D2D"),
            outcome_from_final_lane: true,
        }
    }
}

impl PaletteConfig {
    pub fn for_journey(&self, journey: JourneyType) -> &JourneyPalette {
        match journey {
            JourneyType::DeadFromStart => &self.dead_from_start,
            JourneyType::DiedInCaptivity => &self.died_in_captivity,
            JourneyType::ReleasedAlive => &self.released_alive,
            JourneyType::ReleasedBody => &self.released_body,
            JourneyType::StillCaptive => &self.still_captive,
        }
    }
}

/// Where each transition sits along the path, as `(start%, end%)` of total length.
pub fn transition_bands(path: &PathDescriptor) -> Vec<(f64, f64)> {
    let total = path.total_length();
    if total <= 0.0 || !total.is_finite() {
        return Vec::new();
    }
    let mut walked = 0.0;
    let mut bands = Vec::new();
    for seg in &path.segments {
        let len = seg.length();
        if let Segment::Transition { .. } = seg {
            bands.push((walked * 100.0 / total, (walked + len) * 100.0 / total));
        }
        walked += len;
    }
    bands
}

#[derive(Debug)]
pub struct GradientColorMapper<'a> {
    palette: &'a PaletteConfig,
    registry: &'a LaneRegistry,
}

impl<'a> GradientColorMapper<'a> {
    pub fn new(palette: &'a PaletteConfig, registry: &'a LaneRegistry) -> Self {
        Self { palette, registry }
    }

    fn outcome_color(&self, ind: &Individual) -> &str {
        if self.palette.outcome_from_final_lane {
            self.registry.get(ind.final_lane).color.as_str()
        } else {
            self.palette.for_journey(ind.journey_type).outcome.as_str()
        }
    }

    /// Stops in ascending offset order, always starting at 0% and ending at 100%.
    ///
    /// The start color holds until the first transition; each transition band blends to the
    /// intermediate color, and the last one to the outcome color.
    pub fn stops(
        &self,
        path: &PathDescriptor,
        ind: &Individual,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ColorStop> {
        let palette = self.palette.for_journey(ind.journey_type);
        let solid = |color: &str| {
            vec![
                ColorStop {
                    offset_percent: 0.0,
                    color: color.to_string(),
                },
                ColorStop {
                    offset_percent: 100.0,
                    color: color.to_string(),
                },
            ]
        };

        let total = path.total_length();
        if !total.is_finite() {
            diagnostics.push(
                Stage::Color,
                Some(&ind.id),
                format!("path length {total} is not finite; solid color used"),
            );
            return solid(palette.start.as_str());
        }
        let bands = transition_bands(path);
        let Some(last) = bands.len().checked_sub(1) else {
            return solid(palette.start.as_str());
        };
        if bands.iter().any(|(a, b)| !a.is_finite() || !b.is_finite()) {
            diagnostics.push(
                Stage::Color,
                Some(&ind.id),
                "transition offsets are not finite; solid color used",
            );
            return solid(palette.start.as_str());
        }

        let outcome = self.outcome_color(ind);
        let mut out = Vec::with_capacity(2 * bands.len() + 2);
        let mut push = |offset: f64, color: &str| {
            out.push(ColorStop {
                offset_percent: offset.clamp(0.0, 100.0),
                color: color.to_string(),
            });
        };
        push(0.0, palette.start.as_str());
        for (i, (from, to)) in bands.iter().enumerate() {
            let before = if i == 0 {
                palette.start.as_str()
            } else {
                palette.intermediate.as_str()
            };
            let after = if i == last {
                outcome
            } else {
                palette.intermediate.as_str()
            };
            push(*from, before);
            push(*to, after);
        }
        push(100.0, outcome);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lanetrace_core::{Event, EventKind, LaneId};

    fn at(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn individual(journey: JourneyType, final_lane: LaneId) -> Individual {
        Individual {
            id: "a".to_string(),
            initial_lane: LaneId::AliveAtStart,
            events: vec![Event {
                lane: LaneId::StillHeldLiving,
                timestamp: at(2023, 10, 7),
                kind: EventKind::Entered,
                release: None,
            }],
            final_lane,
            journey_type: journey,
        }
    }

    fn transition(x: f64, y0: f64, y1: f64, lane: LaneId, kind: EventKind) -> Segment {
        Segment::Transition {
            x,
            y0,
            y1,
            turn_radius: 0.0,
            to_lane: lane,
            event_kind: kind,
            at: at(2024, 1, 1),
        }
    }

    #[test]
    fn straight_path_is_solid_start_color() {
        let palette = PaletteConfig::default();
        let reg = LaneRegistry::default();
        let mapper = GradientColorMapper::new(&palette, &reg);
        let path = PathDescriptor {
            individual_id: "a".to_string(),
            segments: vec![Segment::Horizontal {
                x0: 100.0,
                x1: 0.0,
                y: 5.0,
            }],
        };
        let mut d = Diagnostics::new();
        let stops = mapper.stops(
            &path,
            &individual(JourneyType::StillCaptive, LaneId::StillHeldLiving),
            &mut d,
        );
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].offset_percent, 0.0);
        assert_eq!(stops[1].offset_percent, 100.0);
        assert_eq!(stops[0].color, "#FF2D2D");
        assert!(d.is_empty());
    }

    #[test]
    fn single_transition_blends_start_to_outcome_at_its_band() {
        let palette = PaletteConfig::default();
        let reg = LaneRegistry::default();
        let mapper = GradientColorMapper::new(&palette, &reg);
        // 40 horizontal + 20 vertical + 40 horizontal.
        let path = PathDescriptor {
            individual_id: "a".to_string(),
            segments: vec![
                Segment::Horizontal {
                    x0: 100.0,
                    x1: 60.0,
                    y: 0.0,
                },
                transition(60.0, 0.0, 20.0, LaneId::ReleasedMilitaryLiving, EventKind::Released),
                Segment::Horizontal {
                    x0: 60.0,
                    x1: 20.0,
                    y: 20.0,
                },
            ],
        };
        let mut d = Diagnostics::new();
        let stops = mapper.stops(
            &path,
            &individual(JourneyType::ReleasedAlive, LaneId::ReleasedMilitaryLiving),
            &mut d,
        );
        let offsets: Vec<f64> = stops.iter().map(|s| s.offset_percent).collect();
        assert_eq!(offsets, vec![0.0, 40.0, 60.0, 100.0]);
        assert_eq!(stops[1].color, "#DC2626");
        // Outcome follows the final lane color.
        assert_eq!(stops[2].color, "#3B82F6");
        assert_eq!(stops[3].color, "#3B82F6");
    }

    #[test]
    fn two_transitions_pass_through_intermediate_color() {
        let palette = PaletteConfig::default();
        let reg = LaneRegistry::default();
        let mapper = GradientColorMapper::new(&palette, &reg);
        let path = PathDescriptor {
            individual_id: "a".to_string(),
            segments: vec![
                Segment::Horizontal {
                    x0: 100.0,
                    x1: 80.0,
                    y: 0.0,
                },
                transition(80.0, 0.0, 20.0, LaneId::StillHeldDeceased, EventKind::Died),
                Segment::Horizontal {
                    x0: 80.0,
                    x1: 40.0,
                    y: 20.0,
                },
                transition(40.0, 20.0, 40.0, LaneId::ReleasedDealDeceased, EventKind::Released),
                Segment::Horizontal {
                    x0: 40.0,
                    x1: 20.0,
                    y: 40.0,
                },
            ],
        };
        let mut d = Diagnostics::new();
        let stops = mapper.stops(
            &path,
            &individual(JourneyType::ReleasedBody, LaneId::ReleasedDealDeceased),
            &mut d,
        );
        let colors: Vec<&str> = stops.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(
            colors,
            vec!["#DC2626", "#DC2626", "#F87171", "#F87171", "#A855F7", "#A855F7"]
        );
        assert!(stops.windows(2).all(|w| w[0].offset_percent <= w[1].offset_percent));
    }

    #[test]
    fn non_finite_length_degrades_to_solid_with_diagnostic() {
        let palette = PaletteConfig::default();
        let reg = LaneRegistry::default();
        let mapper = GradientColorMapper::new(&palette, &reg);
        let path = PathDescriptor {
            individual_id: "a".to_string(),
            segments: vec![Segment::Horizontal {
                x0: f64::NAN,
                x1: 0.0,
                y: 0.0,
            }],
        };
        let mut d = Diagnostics::new();
        let stops = mapper.stops(
            &path,
            &individual(JourneyType::StillCaptive, LaneId::StillHeldLiving),
            &mut d,
        );
        assert_eq!(stops.len(), 2);
        assert_eq!(d.for_stage(Stage::Color).count(), 1);
    }
}
