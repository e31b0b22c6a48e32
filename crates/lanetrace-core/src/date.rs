//! Date normalization for heterogeneous spreadsheet cells.
//!
//! Order of attempts: contextual phrase, bad-year correction, strict ISO, numeric
//! month/day/year, then a permissive list of human formats. Failures never abort; they return
//! [`NormalizedDate::Invalid`] and append one diagnostic.

use crate::config::ClassifyConfig;
use crate::diagnostics::{Diagnostics, Stage};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateSource {
    Phrase,
    Iso,
    Locale,
    Permissive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedDate {
    Known {
        instant: NaiveDateTime,
        source: DateSource,
        corrected: bool,
    },
    Absent,
    Invalid {
        raw: String,
    },
}

impl NormalizedDate {
    pub fn instant(&self) -> Option<NaiveDateTime> {
        match self {
            NormalizedDate::Known { instant, .. } => Some(*instant),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, NormalizedDate::Invalid { .. })
    }
}

#[derive(Debug)]
pub struct DateNormalizer {
    phrases: Vec<(String, NaiveDateTime)>,
    corrections: Vec<(Regex, String)>,
}

pub(crate) fn normalize_phrase(s: &str) -> String {
    s.replace(['\u{2013}', '\u{2014}'], "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn midnight(d: NaiveDate) -> NaiveDateTime {
    d.and_time(NaiveTime::MIN)
}

fn sane(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    (MIN_YEAR..=MAX_YEAR).contains(&dt.year()).then_some(dt)
}

fn ordinal_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("ordinal suffix regex must compile")
    })
}

fn day_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z]+\.?)\s+(\d{1,2})\s*-\s*\d{1,2},?\s+(\d{4})$")
            .expect("day range regex must compile")
    })
}

fn iso_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2})[ T]\d{2}:\d{2}").expect("iso prefix regex must compile")
    })
}

impl DateNormalizer {
    pub fn new(cfg: &ClassifyConfig) -> Self {
        let phrases = cfg
            .date_phrases
            .iter()
            .map(|(phrase, at)| (normalize_phrase(phrase), cfg.resolve_phrase_instant(*at)))
            .collect();
        let corrections = cfg
            .year_corrections
            .iter()
            .filter_map(|fix| {
                let re = Regex::new(&format!(r"\b{}\b", regex::escape(&fix.wrong))).ok()?;
                Some((re, fix.right.clone()))
            })
            .collect();
        Self {
            phrases,
            corrections,
        }
    }

    /// Normalizes one cell. `individual_id` only labels the diagnostic.
    pub fn normalize(
        &self,
        raw: Option<&str>,
        individual_id: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> NormalizedDate {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return NormalizedDate::Absent;
        };

        if let Some(instant) = self.match_phrase(raw) {
            return NormalizedDate::Known {
                instant,
                source: DateSource::Phrase,
                corrected: false,
            };
        }

        let (text, corrected) = self.correct_year(raw);
        if corrected {
            tracing::debug!(individual = individual_id.unwrap_or("-"), raw, fixed = %text, "corrected year");
        }

        let parsed = parse_iso(&text)
            .map(|dt| (dt, DateSource::Iso))
            .or_else(|| parse_locale_numeric(&text).map(|dt| (dt, DateSource::Locale)))
            .or_else(|| parse_permissive(&text).map(|dt| (dt, DateSource::Permissive)));

        match parsed.and_then(|(dt, src)| Some((sane(dt)?, src))) {
            Some((instant, source)) => NormalizedDate::Known {
                instant,
                source,
                corrected,
            },
            None => {
                diagnostics.push(
                    Stage::Date,
                    individual_id,
                    format!("unparseable date {raw:?}"),
                );
                NormalizedDate::Invalid {
                    raw: raw.to_string(),
                }
            }
        }
    }

    /// Looks up a contextual phrase (e.g. a death-context cell) without parsing it as a date.
    pub fn match_phrase(&self, raw: &str) -> Option<NaiveDateTime> {
        let key = normalize_phrase(raw);
        self.phrases
            .iter()
            .find(|(phrase, _)| *phrase == key)
            .map(|(_, at)| *at)
    }

    fn correct_year(&self, raw: &str) -> (String, bool) {
        for (re, right) in &self.corrections {
            if re.is_match(raw) {
                return (re.replace(raw, right.as_str()).into_owned(), true);
            }
        }
        (raw.to_string(), false)
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(midnight(d));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    None
}

fn parse_locale_numeric(s: &str) -> Option<NaiveDateTime> {
    // Four-digit years first so `%y` never swallows a full year.
    for fmt in ["%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(midnight(d));
        }
    }
    None
}

fn parse_permissive(s: &str) -> Option<NaiveDateTime> {
    if let Some(c) = iso_prefix_re().captures(s) {
        if let Ok(d) = NaiveDate::parse_from_str(&c[1], "%Y-%m-%d") {
            return Some(midnight(d));
        }
    }

    let mut t = s
        .trim_start_matches(['~', '≈'])
        .trim()
        .trim_start_matches("approx.")
        .trim_start_matches("c.")
        .trim()
        .to_string();
    if let Some(idx) = t.find('(') {
        t.truncate(idx);
    }
    let t = ordinal_suffix_re().replace_all(t.trim(), "$1").into_owned();
    // "Nov 24-30, 2023" names a window; its first day is the event date.
    let t = match day_range_re().captures(&t) {
        Some(c) => format!("{} {}, {}", &c[1], &c[2], &c[3]),
        None => t,
    };
    let t = t.replace(". ", " ");

    const FORMATS: &[&str] = &[
        "%b %d, %Y",
        "%B %d, %Y",
        "%b %d %Y",
        "%B %d %Y",
        "%d %B %Y",
        "%d %b %Y",
        "%d %B, %Y",
        "%Y/%m/%d",
        "%d.%m.%Y",
        "%d-%m-%Y",
        "%m-%d-%Y",
    ];
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&t, fmt) {
            return Some(midnight(d));
        }
    }

    // Month-and-year only: pin to the first of the month.
    for fmt in ["%B %Y %d", "%b %Y %d"] {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{t} 1"), fmt) {
            return Some(midnight(d));
        }
    }
    None
}
