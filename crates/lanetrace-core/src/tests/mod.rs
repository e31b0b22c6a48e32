use crate::*;
use chrono::{NaiveDate, NaiveDateTime};

mod classify;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    ymd(y, m, d).and_hms_opt(0, 0, 0).unwrap()
}

/// Default rules with "now" pinned so tests never depend on the clock.
fn cfg() -> ClassifyConfig {
    ClassifyConfig::default().with_fixed_now(Some(ymd(2025, 10, 18)))
}

fn classify_one(record: RawRecord) -> (Individual, Diagnostics) {
    let cfg = cfg();
    let mut diagnostics = Diagnostics::new();
    let ind = StateClassifier::new(&cfg).classify(&record, &mut diagnostics);
    (ind, diagnostics)
}

fn lanes(ind: &Individual) -> Vec<LaneId> {
    ind.events.iter().map(|e| e.lane).collect()
}
