//! Data-driven classification settings.
//!
//! Everything the classifier treats as a business rule rather than logic lives here: keyword
//! sets, canonical instants for contextual death phrases, fallback constants and the bad-year
//! correction. Every field has a default, so partial JSON/YAML documents merge onto the defaults.

use crate::lane::ReleaseMethod;
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a contextual date phrase lands on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhraseInstant {
    Date(NaiveDate),
    Anchor(Anchor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCorrection {
    pub wrong: String,
    pub right: String,
}

/// A named release operation, used to label release events that fall inside its window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOperation {
    pub title: String,
    pub method: ReleaseMethod,
    pub first: NaiveDate,
    pub last: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub start: NaiveDate,
    /// Fixed "now". `None` uses today's local date.
    pub now: Option<NaiveDate>,
    pub death_in_captivity_contexts: Vec<String>,
    pub date_phrases: IndexMap<String, PhraseInstant>,
    pub year_corrections: Vec<YearCorrection>,
    pub military_keywords: Vec<String>,
    pub negotiated_keywords: Vec<String>,
    pub country_names: Vec<String>,
    pub released_status_markers: Vec<String>,
    pub returned_status_markers: Vec<String>,
    /// Words that cancel a directly following release/return marker ("not released").
    pub negation_markers: Vec<String>,
    pub deceased_status_markers: Vec<String>,
    pub remains_markers: Vec<String>,
    pub deceased_initial_markers: Vec<String>,
    pub living_initial_markers: Vec<String>,
    pub fallback_release_date: NaiveDate,
    pub release_operations: Vec<ReleaseOperation>,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        let mut date_phrases = IndexMap::new();
        for phrase in crate::classify::DEATH_AT_START_CONTEXTS {
            date_phrases.insert(phrase.to_string(), PhraseInstant::Anchor(Anchor::Start));
        }
        date_phrases.insert(
            "Killed in Captivity - First Months".to_string(),
            PhraseInstant::Date(date(2023, 12, 15)),
        );
        date_phrases.insert(
            "Killed in Captivity - Date Unknown".to_string(),
            PhraseInstant::Date(date(2024, 6, 1)),
        );

        Self {
            start: date(2023, 10, 7),
            now: None,
            death_in_captivity_contexts: strings(&["died in captivity", "killed in captivity"]),
            date_phrases,
            year_corrections: vec![YearCorrection {
                wrong: "2203".to_string(),
                right: "2023".to_string(),
            }],
            military_keywords: strings(&[
                "military",
                "rescue",
                "rescued",
                "operation",
                "idf",
                "special forces",
                "recovered",
            ]),
            negotiated_keywords: strings(&[
                "deal",
                "agreement",
                "negotiat",
                "truce",
                "ceasefire",
                "humanitarian",
                "unilateral",
                "exchange",
            ]),
            country_names: strings(&[
                "Egypt",
                "Qatar",
                "United States",
                "USA",
                "Thailand",
                "Russia",
                "Philippines",
                "Israel",
            ]),
            released_status_markers: strings(&["released"]),
            returned_status_markers: strings(&["returned"]),
            negation_markers: strings(&["not", "un", "never", "yet to be", "awaiting"]),
            deceased_status_markers: strings(&["deceased", "dead", "killed"]),
            remains_markers: strings(&["body", "bodies", "remains"]),
            deceased_initial_markers: strings(&["deceased", "dead", "killed"]),
            living_initial_markers: strings(&["alive", "living", "abducted"]),
            fallback_release_date: date(2023, 11, 30),
            release_operations: vec![
                ReleaseOperation {
                    title: "Humanitarian Release".to_string(),
                    method: ReleaseMethod::Negotiated,
                    first: date(2023, 10, 20),
                    last: date(2023, 10, 24),
                },
                ReleaseOperation {
                    title: "IDF Rescue Operation".to_string(),
                    method: ReleaseMethod::Military,
                    first: date(2023, 10, 30),
                    last: date(2023, 10, 30),
                },
                ReleaseOperation {
                    title: "2023 Temporary Truce".to_string(),
                    method: ReleaseMethod::Negotiated,
                    first: date(2023, 11, 24),
                    last: date(2023, 12, 1),
                },
                ReleaseOperation {
                    title: "Operation Golden Hand".to_string(),
                    method: ReleaseMethod::Military,
                    first: date(2024, 2, 12),
                    last: date(2024, 2, 13),
                },
                ReleaseOperation {
                    title: "Nuseirat Rescue Operation".to_string(),
                    method: ReleaseMethod::Military,
                    first: date(2024, 6, 8),
                    last: date(2024, 6, 10),
                },
                ReleaseOperation {
                    title: "2025 Hostage Agreement".to_string(),
                    method: ReleaseMethod::Negotiated,
                    first: date(2025, 1, 19),
                    last: date(2025, 2, 27),
                },
            ],
        }
    }
}

impl ClassifyConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads a config file, picking the format from the extension (`.yaml`/`.yml`, else JSON).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| Error::InvalidConfig {
            message: format!("failed to read {}: {err}", path.display()),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    pub fn with_fixed_now(mut self, now: Option<NaiveDate>) -> Self {
        self.now = now;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(now) = self.now {
            if now <= self.start {
                return Err(Error::InvalidConfig {
                    message: format!("now ({now}) must be after start ({})", self.start),
                });
            }
        }
        if self.fallback_release_date < self.start {
            return Err(Error::InvalidConfig {
                message: "fallback_release_date precedes start".to_string(),
            });
        }
        for fix in &self.year_corrections {
            let is_year = |s: &str| s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit());
            if !is_year(&fix.wrong) || !is_year(&fix.right) {
                return Err(Error::InvalidConfig {
                    message: format!(
                        "year correction {} -> {} must use 4-digit years",
                        fix.wrong, fix.right
                    ),
                });
            }
        }
        for op in &self.release_operations {
            if op.first > op.last {
                return Err(Error::InvalidConfig {
                    message: format!("release operation {:?} ends before it starts", op.title),
                });
            }
        }
        Ok(())
    }

    pub fn now_date(&self) -> NaiveDate {
        self.now
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn start_instant(&self) -> NaiveDateTime {
        self.start.and_time(chrono::NaiveTime::MIN)
    }

    pub fn now_instant(&self) -> NaiveDateTime {
        self.now_date().and_time(chrono::NaiveTime::MIN)
    }

    pub fn resolve_phrase_instant(&self, instant: PhraseInstant) -> NaiveDateTime {
        match instant {
            PhraseInstant::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            PhraseInstant::Anchor(Anchor::Start) => self.start_instant(),
        }
    }

    pub fn operation_for(&self, method: ReleaseMethod, day: NaiveDate) -> Option<&ReleaseOperation> {
        self.release_operations
            .iter()
            .find(|op| op.method == method && op.first <= day && day <= op.last)
    }
}
