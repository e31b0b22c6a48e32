use lanetrace_core::{
    ClassifyConfig, ColumnMap, Diagnostics, JourneyType, LaneId, LaneRegistry, MethodBasis,
    Stage, Summary, classify_all, read_csv,
};
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn fixture(name: &str) -> String {
    let path = workspace_root().join("fixtures").join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {err}", path.display()))
}

fn cfg() -> ClassifyConfig {
    ClassifyConfig::default().with_fixed_now(chrono::NaiveDate::from_ymd_opt(2025, 10, 18))
}

#[test]
fn timeline_fixture_classifies_into_every_outcome_lane() {
    let ingested = read_csv(&fixture("timeline.csv"), &ColumnMap::default()).unwrap();
    assert!(ingested.diagnostics.is_empty(), "{:?}", ingested.diagnostics);
    assert_eq!(ingested.records.len(), 15);

    let cfg = cfg();
    let mut diagnostics = Diagnostics::new();
    let out = classify_all(&ingested.records, &cfg, &mut diagnostics);
    let final_of = |id: &str| {
        out.iter()
            .find(|i| i.id == id)
            .map(|i| i.final_lane)
            .unwrap()
    };

    assert_eq!(final_of("Person 01"), LaneId::ReleasedDealLiving);
    assert_eq!(final_of("Person 02"), LaneId::ReleasedDealLiving);
    assert_eq!(final_of("Person 03"), LaneId::ReleasedDealLiving);
    assert_eq!(final_of("Person 04"), LaneId::ReleasedMilitaryLiving);
    assert_eq!(final_of("Person 05"), LaneId::ReleasedMilitaryLiving);
    assert_eq!(final_of("Person 06"), LaneId::ReleasedDealLiving);
    assert_eq!(final_of("Person 07"), LaneId::StillHeldLiving);
    assert_eq!(final_of("Person 09"), LaneId::StillHeldDeceased);
    assert_eq!(final_of("Person 10"), LaneId::ReleasedDealDeceased);
    assert_eq!(final_of("Person 11"), LaneId::ReleasedDealDeceased);
    assert_eq!(final_of("Person 12"), LaneId::DeceasedAtStart);
    assert_eq!(final_of("Person 13"), LaneId::ReleasedMilitaryDeceased);
    assert_eq!(final_of("Person 14"), LaneId::StillHeldDeceased);
    assert_eq!(final_of("Person 15"), LaneId::StillHeldLiving);

    let p10 = out.iter().find(|i| i.id == "Person 10").unwrap();
    assert_eq!(p10.events.len(), 3, "corrected death year yields a death event");

    let p03 = out.iter().find(|i| i.id == "Person 03").unwrap();
    assert_eq!(
        p03.release_event().unwrap().release.as_ref().unwrap().basis,
        MethodBasis::CountryList
    );

    let classify_notes: Vec<_> = diagnostics
        .for_stage(Stage::Classify)
        .filter_map(|d| d.individual_id.as_deref())
        .collect();
    assert!(classify_notes.contains(&"Person 03"));
    assert!(classify_notes.contains(&"Person 06"));
    assert!(classify_notes.contains(&"Person 13"));
    assert!(classify_notes.contains(&"Person 15"));

    let summary = Summary::from_individuals(&out, &LaneRegistry::default());
    assert_eq!(summary.total, 15);
    assert_eq!(summary.by_journey[&JourneyType::DeadFromStart], 2);
    assert_eq!(summary.still_held_living, 3);
}

#[test]
fn malformed_fixture_reports_the_opening_line() {
    let err = read_csv(&fixture("malformed.csv"), &ColumnMap::default())
        .unwrap_err()
        .to_string();
    assert_eq!(err, "CSV error (line 2): unterminated quoted field");
}
