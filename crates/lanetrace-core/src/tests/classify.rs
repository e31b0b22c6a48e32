use super::*;

#[test]
fn death_in_captivity_without_release_moves_to_deceased_counterpart() {
    let (ind, diagnostics) = classify_one(
        RawRecord::new("x")
            .status("Held in Gaza")
            .death_context("Killed in Captivity")
            .death_date("2024-01-10"),
    );
    assert_eq!(
        lanes(&ind),
        vec![LaneId::StillHeldLiving, LaneId::StillHeldDeceased]
    );
    assert_eq!(ind.events[1].kind, EventKind::Died);
    assert_eq!(ind.events[1].timestamp, at(2024, 1, 10));
    assert_eq!(ind.journey_type, JourneyType::DiedInCaptivity);
    assert!(diagnostics.is_empty());
}

#[test]
fn death_phrase_in_context_supplies_placeholder_instant() {
    let (ind, _) = classify_one(
        RawRecord::new("x")
            .status("Deceased")
            .death_context("Killed in Captivity - First Months"),
    );
    let died = ind.death_event().unwrap();
    assert_eq!(died.timestamp, at(2023, 12, 15));
    assert_eq!(ind.final_lane, LaneId::StillHeldDeceased);
}

#[test]
fn body_of_individual_killed_at_start_is_returned_deceased() {
    let (ind, _) = classify_one(
        RawRecord::new("x")
            .status("Deceased - Returned")
            .death_context("Died Before/During Kidnapping")
            .release_date("2025-02-27")
            .circumstances("Returned in Deal - Body"),
    );
    assert_eq!(ind.initial_lane, LaneId::DeceasedAtStart);
    assert_eq!(lanes(&ind), vec![LaneId::ReleasedDealDeceased]);
    assert_eq!(ind.journey_type, JourneyType::DeadFromStart);
    let release = ind.release_event().unwrap().release.as_ref().unwrap();
    assert_eq!(release.operation.as_deref(), Some("2025 Hostage Agreement"));
}

#[test]
fn death_on_start_date_counts_as_deceased_at_start() {
    let (ind, diagnostics) = classify_one(RawRecord::new("x").death_date("2023-10-07"));
    assert_eq!(ind.initial_lane, LaneId::DeceasedAtStart);
    assert!(ind.events.is_empty());
    assert!(diagnostics.is_empty());

    let (ind, diagnostics) = classify_one(RawRecord::new("y").death_date("2023-10-01"));
    assert_eq!(ind.initial_lane, LaneId::DeceasedAtStart);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn returned_body_without_death_date_goes_straight_to_deceased_release_lane() {
    let (ind, diagnostics) = classify_one(
        RawRecord::new("x")
            .status("Deceased - Returned")
            .release_date("2024-08-20")
            .circumstances("Returned in Military Operation - Body"),
    );
    assert_eq!(
        lanes(&ind),
        vec![LaneId::StillHeldLiving, LaneId::ReleasedMilitaryDeceased]
    );
    assert_eq!(ind.journey_type, JourneyType::ReleasedBody);
    assert!(
        diagnostics
            .iter()
            .any(|d| d.message.contains("without a usable death date"))
    );
}

#[test]
fn missing_release_date_is_derived_from_day_count_then_fallback() {
    let (ind, diagnostics) = classify_one(
        RawRecord::new("x")
            .status("Released")
            .circumstances("Released via deal")
            .captivity_summary("Released after 50 days in captivity"),
    );
    let release = ind.release_event().unwrap();
    assert_eq!(release.timestamp, at(2023, 11, 26));
    assert!(release.release.as_ref().unwrap().date_synthesized);
    assert_eq!(diagnostics.len(), 1);

    let (ind, diagnostics) = classify_one(
        RawRecord::new("y")
            .status("Released")
            .circumstances("Released via deal"),
    );
    assert_eq!(ind.release_event().unwrap().timestamp, at(2023, 11, 30));
    assert!(diagnostics.iter().any(|d| d.message.contains("fallback")));
}

#[test]
fn unparseable_release_date_is_synthesized_after_a_date_diagnostic() {
    let (ind, diagnostics) = classify_one(
        RawRecord::new("x")
            .status("Released")
            .circumstances("deal")
            .release_date("around the truce"),
    );
    assert_eq!(ind.release_event().unwrap().timestamp, at(2023, 11, 30));
    let stages: Vec<Stage> = diagnostics.iter().map(|d| d.stage).collect();
    assert_eq!(stages, vec![Stage::Date, Stage::Classify]);
}

#[test]
fn earliest_keyword_decides_when_both_sets_match() {
    let method = |circ: &str| {
        let (ind, _) = classify_one(
            RawRecord::new("x")
                .status("Released")
                .circumstances(circ)
                .release_date("2024-02-12"),
        );
        ind.release_event().unwrap().release.as_ref().unwrap().method
    };
    assert_eq!(method("Military operation after deal collapsed"), ReleaseMethod::Military);
    assert_eq!(method("Deal brokered, later military escort"), ReleaseMethod::Negotiated);
}

#[test]
fn unknown_release_method_defaults_to_negotiated() {
    let (ind, diagnostics) = classify_one(
        RawRecord::new("x")
            .status("Released")
            .circumstances("unclear circumstances")
            .release_date("2023-11-25"),
    );
    let release = ind.release_event().unwrap().release.as_ref().unwrap();
    assert_eq!(release.method, ReleaseMethod::Negotiated);
    assert_eq!(release.basis, MethodBasis::Defaulted);
    assert!(diagnostics.iter().any(|d| d.message.contains("defaulted to negotiated")));
}

#[test]
fn countries_column_backs_the_bare_country_rule() {
    let (ind, _) = classify_one(
        RawRecord::new("x")
            .status("Released")
            .countries("Qatar, Egypt")
            .release_date("2023-11-25"),
    );
    let release = ind.release_event().unwrap().release.as_ref().unwrap();
    assert_eq!(release.basis, MethodBasis::CountryList);
}

#[test]
fn release_date_without_release_status_is_ignored() {
    let (ind, diagnostics) = classify_one(
        RawRecord::new("x")
            .status("Held in Gaza")
            .release_date("2024-01-01"),
    );
    assert!(ind.release_event().is_none());
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn initial_status_disagreement_is_reported_but_rules_win() {
    let (ind, diagnostics) = classify_one(RawRecord::new("x").initial_status("Deceased"));
    assert_eq!(ind.initial_lane, LaneId::AliveAtStart);
    assert!(diagnostics.iter().any(|d| d.message.contains("disagrees")));

    let (_, diagnostics) = classify_one(RawRecord::new("y").initial_status("Civilian"));
    assert!(diagnostics.is_empty());
}

#[test]
fn future_death_date_is_ignored() {
    let (ind, diagnostics) = classify_one(RawRecord::new("x").death_date("2026-01-01"));
    assert_eq!(ind.final_lane, LaneId::StillHeldLiving);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn events_are_ordered_and_never_repeat_a_lane() {
    let statuses = ["Released", "Deceased - Returned", "Held in Gaza", "Deceased", ""];
    let contexts = ["", "Died in Captivity", "Died Before/During Kidnapping"];
    let deaths = ["", "2024-03-01", "2023-10-07", "not a date"];
    let releases = ["", "2023-11-25", "2024-06-08", "2030-01-01"];
    let circs = ["", "Deal", "Military", "Egypt", "???"];

    let mut records = Vec::new();
    for (a, s) in statuses.iter().enumerate() {
        for (b, c) in contexts.iter().enumerate() {
            for (d, dd) in deaths.iter().enumerate() {
                for (e, r) in releases.iter().enumerate() {
                    for (f, circ) in circs.iter().enumerate() {
                        records.push(
                            RawRecord::new(format!("r{a}{b}{d}{e}{f}"))
                                .status(s)
                                .death_context(c)
                                .death_date(dd)
                                .release_date(r)
                                .circumstances(circ),
                        );
                    }
                }
            }
        }
    }

    let cfg = cfg();
    let mut diagnostics = Diagnostics::new();
    let out = classify_all(&records, &cfg, &mut diagnostics);
    assert_eq!(out.len(), records.len());
    for ind in &out {
        for pair in ind.events.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp, "{}", ind.id);
            assert_ne!(pair[0].lane, pair[1].lane, "{}", ind.id);
        }
        assert!(ind.transitions().filter(|e| e.kind == EventKind::Died).count() <= 1);
        assert!(ind.transitions().filter(|e| e.kind == EventKind::Released).count() <= 1);
        assert_eq!(
            ind.final_lane,
            ind.events.last().map(|e| e.lane).unwrap_or(ind.initial_lane)
        );
        assert!(matches!(
            ind.initial_lane,
            LaneId::AliveAtStart | LaneId::DeceasedAtStart
        ));
    }
}

#[test]
fn summary_tallies_final_lanes_and_journeys() {
    let records = vec![
        RawRecord::new("a").status("Held in Gaza"),
        RawRecord::new("b").death_context("Died Before/During Kidnapping"),
        RawRecord::new("c")
            .status("Released")
            .circumstances("Deal")
            .release_date("2023-11-25"),
    ];
    let cfg = cfg();
    let mut diagnostics = Diagnostics::new();
    let out = classify_all(&records, &cfg, &mut diagnostics);
    let summary = Summary::from_individuals(&out, &LaneRegistry::default());
    assert_eq!(summary.total, 3);
    assert_eq!(summary.still_held_living, 1);
    assert_eq!(summary.still_held_deceased, 1);
    assert_eq!(summary.by_journey[&JourneyType::ReleasedAlive], 1);
    assert_eq!(summary.by_final_lane[&LaneId::ReleasedDealLiving], 1);
}

#[test]
fn keywords_only_match_at_word_starts() {
    let (ind, _) = classify_one(
        RawRecord::new("x")
            .status("Released")
            .circumstances("Released in cooperation with Qatar")
            .release_date("2023-11-28"),
    );
    assert_eq!(ind.final_lane, LaneId::ReleasedDealLiving);

    let (ind, _) = classify_one(
        RawRecord::new("y")
            .status("Released")
            .circumstances("An ideal outcome after the IDF operation")
            .release_date("2024-06-08"),
    );
    let release = ind.release_event().unwrap().release.as_ref().unwrap();
    assert_eq!(release.method, ReleaseMethod::Military);
    assert_eq!(release.basis, MethodBasis::Keyword);

    let (ind, _) = classify_one(
        RawRecord::new("z")
            .status("Released")
            .circumstances("Negotiated release")
            .release_date("2023-11-28"),
    );
    let release = ind.release_event().unwrap().release.as_ref().unwrap();
    assert_eq!(release.basis, MethodBasis::Keyword);
    assert_eq!(ind.final_lane, LaneId::ReleasedDealLiving);
}

#[test]
fn negated_release_status_keeps_the_individual_held() {
    for status in ["Not released", "Un-released", "Never returned"] {
        let (ind, diagnostics) = classify_one(
            RawRecord::new("x")
                .status(status)
                .circumstances("Released via deal")
                .release_date("2023-11-28"),
        );
        assert_eq!(ind.final_lane, LaneId::StillHeldLiving, "{status}");
        assert!(ind.release_event().is_none(), "{status}");
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("status does not indicate release")),
            "{status}"
        );
    }
}

#[test]
fn suppressed_death_date_is_reported_as_such() {
    let (ind, diagnostics) = classify_one(
        RawRecord::new("x")
            .status("Deceased - Returned")
            .death_date("2024-01-10")
            .release_date("2024-08-20")
            .circumstances("Returned in Military Operation - Body"),
    );
    assert_eq!(lanes(&ind), vec![LaneId::StillHeldLiving, LaneId::ReleasedMilitaryDeceased]);
    assert!(ind.death_event().is_none());
    let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.contains("death date 2024-01-10")), "{messages:?}");
    assert!(!messages.iter().any(|m| m.contains("without a usable death date")), "{messages:?}");
}
