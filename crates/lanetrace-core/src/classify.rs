//! Raw record → initial lane + strictly ordered lane-transition events.
//!
//! Classification is total: every record yields an [`Individual`]. Ambiguities are resolved by
//! fixed rules and reported through [`Diagnostics`]; an internal failure falls back to the
//! alive-at-start / still-held-living default so one bad row never aborts a batch.

use crate::config::ClassifyConfig;
use crate::date::{DateNormalizer, NormalizedDate, normalize_phrase as normalize_text};
use crate::diagnostics::{Diagnostics, Stage};
use crate::lane::{LaneId, ReleaseMethod, Vitality};
use crate::record::RawRecord;
use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Death-context phrases meaning the individual died in the triggering incident itself.
pub const DEATH_AT_START_CONTEXTS: [&str; 2] =
    ["Died Before/During Kidnapping", "Killed During Kidnapping"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Entered,
    Died,
    Released,
}

/// How a release method was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodBasis {
    Keyword,
    CountryList,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDetail {
    pub method: ReleaseMethod,
    pub basis: MethodBasis,
    pub date_synthesized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub lane: LaneId,
    pub timestamp: NaiveDateTime,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JourneyType {
    DeadFromStart,
    DiedInCaptivity,
    ReleasedAlive,
    ReleasedBody,
    StillCaptive,
}

impl JourneyType {
    pub const ALL: [JourneyType; 5] = [
        JourneyType::DeadFromStart,
        JourneyType::DiedInCaptivity,
        JourneyType::ReleasedAlive,
        JourneyType::ReleasedBody,
        JourneyType::StillCaptive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JourneyType::DeadFromStart => "dead-from-start",
            JourneyType::DiedInCaptivity => "died-in-captivity",
            JourneyType::ReleasedAlive => "released-alive",
            JourneyType::ReleasedBody => "released-body",
            JourneyType::StillCaptive => "still-captive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Individual {
    pub id: String,
    pub initial_lane: LaneId,
    pub events: Vec<Event>,
    pub final_lane: LaneId,
    pub journey_type: JourneyType,
}

impl Individual {
    fn fallback(id: &str, start: NaiveDateTime) -> Self {
        Self {
            id: id.to_string(),
            initial_lane: LaneId::AliveAtStart,
            events: vec![Event {
                lane: LaneId::StillHeldLiving,
                timestamp: start,
                kind: EventKind::Entered,
                release: None,
            }],
            final_lane: LaneId::StillHeldLiving,
            journey_type: JourneyType::StillCaptive,
        }
    }

    /// The lane the path starts in: the entered lane when present, otherwise the initial lane.
    pub fn start_lane(&self) -> LaneId {
        match self.events.first() {
            Some(e) if e.kind == EventKind::Entered => e.lane,
            _ => self.initial_lane,
        }
    }

    /// Events that move the path between lanes (everything except `entered`).
    pub fn transitions(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().filter(|e| e.kind != EventKind::Entered)
    }

    pub fn visited_lanes(&self) -> Vec<LaneId> {
        std::iter::once(self.start_lane())
            .chain(self.transitions().map(|e| e.lane))
            .collect()
    }

    pub fn death_event(&self) -> Option<&Event> {
        self.events.iter().find(|e| e.kind == EventKind::Died)
    }

    pub fn release_event(&self) -> Option<&Event> {
        self.events.iter().find(|e| e.kind == EventKind::Released)
    }

    /// Timestamp of the last transition, if any.
    pub fn resolved_at(&self) -> Option<NaiveDateTime> {
        self.transitions().last().map(|e| e.timestamp)
    }

    pub fn is_still_held(&self) -> bool {
        !self.final_lane.is_released()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("timestamp overflow adding {days} days to start")]
    TimestampOverflow { days: i64 },

    #[error("event order violated: {lane} at {at} precedes previous event")]
    EventOrder { lane: LaneId, at: NaiveDateTime },

    #[error("consecutive events share lane {lane}")]
    RepeatedLane { lane: LaneId },

    #[error("illegal initial lane {lane}")]
    InitialLane { lane: LaneId },
}

/// A configured keyword list compiled into one case-insensitive alternation. Keywords only
/// match at the start of a word, so `operation` does not fire inside "cooperation" while stems
/// such as `negotiat` still cover "negotiated".
#[derive(Debug, Clone)]
struct KeywordSet {
    re: Option<Regex>,
}

impl KeywordSet {
    fn new(keywords: &[String]) -> Self {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| normalize_text(k))
            .filter(|k| !k.is_empty())
            .map(|k| {
                let escaped = regex::escape(&k);
                if k.starts_with(|c: char| c.is_alphanumeric()) {
                    format!(r"\b{escaped}")
                } else {
                    escaped
                }
            })
            .collect();
        if alternatives.is_empty() {
            return Self { re: None };
        }
        let pattern = format!("(?i)(?:{})", alternatives.join("|"));
        match Regex::new(&pattern) {
            Ok(re) => Self { re: Some(re) },
            Err(err) => {
                tracing::warn!(%err, "keyword list did not compile; it will match nothing");
                Self { re: None }
            }
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        self.re.as_ref().is_some_and(|re| re.is_match(haystack))
    }

    /// Byte offset of the leftmost keyword.
    fn first_match(&self, haystack: &str) -> Option<usize> {
        self.re.as_ref()?.find(haystack).map(|m| m.start())
    }

    /// Like [`Self::is_match`], but an occurrence directly preceded by a negation
    /// ("not released", "un-released", "yet to be returned") does not count.
    fn is_affirmed(&self, haystack: &str, negations: &KeywordSet) -> bool {
        let Some(re) = self.re.as_ref() else {
            return false;
        };
        re.find_iter(haystack).any(|m| {
            let before = haystack[..m.start()].trim_end_matches(|c: char| c.is_whitespace() || c == '-');
            !negations.ends_with(before)
        })
    }

    /// Whether `text` ends with one of the keywords as a whole word.
    fn ends_with(&self, text: &str) -> bool {
        let Some(re) = self.re.as_ref() else {
            return false;
        };
        re.find_iter(text).any(|m| m.end() == text.len())
    }
}

/// Keyword lists from [`ClassifyConfig`], compiled once per classifier.
#[derive(Debug, Clone)]
struct Keywords {
    military: KeywordSet,
    negotiated: KeywordSet,
    released_status: KeywordSet,
    returned_status: KeywordSet,
    negation: KeywordSet,
    deceased_status: KeywordSet,
    remains: KeywordSet,
    death_in_captivity: KeywordSet,
    deceased_initial: KeywordSet,
    living_initial: KeywordSet,
}

impl Keywords {
    fn new(cfg: &ClassifyConfig) -> Self {
        Self {
            military: KeywordSet::new(&cfg.military_keywords),
            negotiated: KeywordSet::new(&cfg.negotiated_keywords),
            released_status: KeywordSet::new(&cfg.released_status_markers),
            returned_status: KeywordSet::new(&cfg.returned_status_markers),
            negation: KeywordSet::new(&cfg.negation_markers),
            deceased_status: KeywordSet::new(&cfg.deceased_status_markers),
            remains: KeywordSet::new(&cfg.remains_markers),
            death_in_captivity: KeywordSet::new(&cfg.death_in_captivity_contexts),
            deceased_initial: KeywordSet::new(&cfg.deceased_initial_markers),
            living_initial: KeywordSet::new(&cfg.living_initial_markers),
        }
    }
}

fn day_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:after\s+(\d{1,4})\s+days|אחרי\s+(\d{1,4})\s+ימים)")
            .expect("day count regex must compile")
    })
}

fn country_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s*(?:,|/|;|&|\+|\band\b)\s*").expect("country separator regex must compile")
    })
}

/// Extracts "after N days" (English or Hebrew) from a free-text summary.
pub fn extract_day_count(summary: &str) -> Option<i64> {
    let caps = day_count_re().captures(summary)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    timestamp: NaiveDateTime,
    kind: EventKind,
}

#[derive(Debug, Clone)]
struct ReleasePlan {
    timestamp: NaiveDateTime,
    detail: ReleaseDetail,
    deceased: bool,
}

#[derive(Debug)]
pub struct StateClassifier<'a> {
    cfg: &'a ClassifyConfig,
    dates: DateNormalizer,
    start: NaiveDateTime,
    now: NaiveDateTime,
    death_at_start: Vec<String>,
    keywords: Keywords,
}

impl<'a> StateClassifier<'a> {
    pub fn new(cfg: &'a ClassifyConfig) -> Self {
        Self {
            cfg,
            dates: DateNormalizer::new(cfg),
            start: cfg.start_instant(),
            now: cfg.now_instant(),
            death_at_start: DEATH_AT_START_CONTEXTS
                .iter()
                .map(|p| normalize_text(p))
                .collect(),
            keywords: Keywords::new(cfg),
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn classify_all(&self, records: &[RawRecord], diagnostics: &mut Diagnostics) -> Vec<Individual> {
        let out: Vec<Individual> = records.iter().map(|r| self.classify(r, diagnostics)).collect();
        tracing::debug!(individuals = out.len(), "classified records");
        out
    }

    /// Never fails; see the module docs for the fallback.
    pub fn classify(&self, record: &RawRecord, diagnostics: &mut Diagnostics) -> Individual {
        let mut local = Diagnostics::new();
        let result = self.try_classify(record, &mut local);
        diagnostics.append(local);
        match result {
            Ok(ind) => ind,
            Err(err) => {
                diagnostics.push(
                    Stage::Classify,
                    Some(&record.id),
                    format!("classification failed ({err}); defaulted to alive-at-start/still-held-living"),
                );
                Individual::fallback(&record.id, self.start)
            }
        }
    }

    fn try_classify(
        &self,
        record: &RawRecord,
        diagnostics: &mut Diagnostics,
    ) -> Result<Individual, ClassifyError> {
        let id = record.id.as_str();
        let status = record.current_status.as_deref().map(normalize_text).unwrap_or_default();
        let circumstances = record.circumstances.as_deref().map(normalize_text).unwrap_or_default();
        let context = record.death_context.as_deref().map(normalize_text).unwrap_or_default();

        let death = self.death_instant(record, diagnostics);
        let context_at_start = self.death_at_start.iter().any(|p| *p == context);
        let dead_at_start = context_at_start || death.is_some_and(|d| d <= self.start);
        if let Some(d) = death.filter(|d| *d < self.start) {
            diagnostics.push(
                Stage::Classify,
                Some(id),
                format!("death date {d} precedes start; treated as deceased at start"),
            );
        }
        let initial_lane = if dead_at_start {
            LaneId::DeceasedAtStart
        } else {
            LaneId::AliveAtStart
        };
        self.cross_check_initial(record, dead_at_start, diagnostics);

        let release = self.release_plan(record, &status, &circumstances, diagnostics)?;
        let mut pending = Vec::with_capacity(2);

        let died_in_captivity_ctx = self.keywords.death_in_captivity.is_match(&context);
        if let Some(d) = death.filter(|d| *d > self.start) {
            if release.is_none() || died_in_captivity_ctx {
                pending.push(Pending {
                    timestamp: d,
                    kind: EventKind::Died,
                });
            }
        }
        let has_death_event = !pending.is_empty();

        let mut release_detail = None;
        let mut release_deceased = false;
        if let Some(plan) = release {
            release_deceased = plan.deceased || has_death_event || dead_at_start;
            if release_deceased && !has_death_event && !dead_at_start {
                let message = match death {
                    Some(d) => format!(
                        "returned deceased; death date {d} not drawn because the death context does not place it in captivity"
                    ),
                    None => "returned deceased without a usable death date; no death event".to_string(),
                };
                diagnostics.push(Stage::Classify, Some(id), message);
            }
            pending.push(Pending {
                timestamp: plan.timestamp,
                kind: EventKind::Released,
            });
            release_detail = Some(plan.detail);
        }

        pending.sort_by_key(|p| (p.timestamp, p.kind));

        let mut events = Vec::with_capacity(pending.len() + 1);
        if initial_lane == LaneId::AliveAtStart {
            events.push(Event {
                lane: LaneId::StillHeldLiving,
                timestamp: self.start,
                kind: EventKind::Entered,
                release: None,
            });
        }
        let mut current = events.last().map(|e| e.lane).unwrap_or(initial_lane);
        for p in pending {
            let (lane, release) = match p.kind {
                EventKind::Died => (current.deceased_counterpart(), None),
                EventKind::Released => {
                    let Some(detail) = release_detail.clone() else {
                        continue;
                    };
                    let vitality = if release_deceased || current.vitality() == Vitality::Deceased {
                        Vitality::Deceased
                    } else {
                        Vitality::Living
                    };
                    (LaneId::release_lane(detail.method, vitality), Some(detail))
                }
                EventKind::Entered => continue,
            };
            if lane == current {
                diagnostics.push(
                    Stage::Classify,
                    Some(id),
                    format!("dropped {:?} event: already in {lane}", p.kind),
                );
                continue;
            }
            events.push(Event {
                lane,
                timestamp: p.timestamp,
                kind: p.kind,
                release,
            });
            current = lane;
        }

        let final_lane = events.last().map(|e| e.lane).unwrap_or(initial_lane);
        let journey_type = journey_type(initial_lane, &events, final_lane);
        let ind = Individual {
            id: id.to_string(),
            initial_lane,
            events,
            final_lane,
            journey_type,
        };
        check_invariants(&ind)?;
        Ok(ind)
    }

    /// Death date cell first; if it is missing or unusable, a contextual phrase in the
    /// death-context cell.
    fn death_instant(&self, record: &RawRecord, diagnostics: &mut Diagnostics) -> Option<NaiveDateTime> {
        let id = Some(record.id.as_str());
        let from_cell = self.dates.normalize(record.death_date.as_deref(), id, diagnostics);
        let death = from_cell.instant().or_else(|| {
            record
                .death_context
                .as_deref()
                .and_then(|ctx| self.dates.match_phrase(ctx))
        })?;
        if death > self.now {
            diagnostics.push(
                Stage::Classify,
                id,
                format!("death date {death} is after now; ignored"),
            );
            return None;
        }
        Some(death)
    }

    fn cross_check_initial(&self, record: &RawRecord, dead_at_start: bool, diagnostics: &mut Diagnostics) {
        let Some(initial) = record.initial_status.as_deref().map(normalize_text) else {
            return;
        };
        let says_deceased = self.keywords.deceased_initial.is_match(&initial);
        let says_living = self.keywords.living_initial.is_match(&initial);
        // Indicators without a vitality marker (e.g. "Civilian") carry no signal.
        let disagrees = (says_deceased && !dead_at_start) || (says_living && !says_deceased && dead_at_start);
        if disagrees {
            diagnostics.push(
                Stage::Classify,
                Some(&record.id),
                format!(
                    "initial status {initial:?} disagrees with derived {}; derived lane kept",
                    if dead_at_start { "deceased-at-start" } else { "alive-at-start" }
                ),
            );
        }
    }

    fn release_plan(
        &self,
        record: &RawRecord,
        status: &str,
        circumstances: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<ReleasePlan>, ClassifyError> {
        let id = Some(record.id.as_str());
        let kw = &self.keywords;
        let released = kw.released_status.is_affirmed(status, &kw.negation);
        let returned = kw.returned_status.is_affirmed(status, &kw.negation);
        if !released && !returned {
            if record.release_date.is_some() {
                diagnostics.push(
                    Stage::Classify,
                    id,
                    "release date present but status does not indicate release; ignored",
                );
            }
            return Ok(None);
        }

        let (timestamp, date_synthesized) =
            match self.dates.normalize(record.release_date.as_deref(), id, diagnostics) {
                NormalizedDate::Known { instant, .. } => (instant, false),
                NormalizedDate::Absent | NormalizedDate::Invalid { .. } => {
                    (self.synthesize_release(record, diagnostics)?, true)
                }
            };
        let timestamp = if timestamp < self.start {
            diagnostics.push(
                Stage::Classify,
                id,
                format!("release date {timestamp} precedes start; clamped to start"),
            );
            self.start
        } else {
            timestamp
        };
        if timestamp > self.now {
            diagnostics.push(
                Stage::Classify,
                id,
                format!("release date {timestamp} is after now; treated as not yet released"),
            );
            return Ok(None);
        }

        let (method, basis) = self.release_method(record, status, circumstances, diagnostics);
        let operation = self
            .cfg
            .operation_for(method, timestamp.date())
            .map(|op| op.title.clone());
        let deceased = returned
            || kw.deceased_status.is_match(status)
            || kw.remains.is_match(status)
            || kw.remains.is_match(circumstances);

        Ok(Some(ReleasePlan {
            timestamp,
            detail: ReleaseDetail {
                method,
                basis,
                date_synthesized,
                operation,
            },
            deceased,
        }))
    }

    fn synthesize_release(
        &self,
        record: &RawRecord,
        diagnostics: &mut Diagnostics,
    ) -> Result<NaiveDateTime, ClassifyError> {
        let id = Some(record.id.as_str());
        if let Some(days) = record.captivity_summary.as_deref().and_then(extract_day_count) {
            let at = Duration::try_days(days)
                .and_then(|d| self.start.checked_add_signed(d))
                .ok_or(ClassifyError::TimestampOverflow { days })?;
            diagnostics.push(
                Stage::Classify,
                id,
                format!("release date missing; derived {} from {days} days in captivity", at.date()),
            );
            return Ok(at);
        }
        let at = self
            .cfg
            .fallback_release_date
            .and_time(chrono::NaiveTime::MIN);
        diagnostics.push(
            Stage::Classify,
            id,
            format!("release date missing; used fallback {}", at.date()),
        );
        Ok(at)
    }

    fn release_method(
        &self,
        record: &RawRecord,
        status: &str,
        circumstances: &str,
        diagnostics: &mut Diagnostics,
    ) -> (ReleaseMethod, MethodBasis) {
        let id = Some(record.id.as_str());
        for text in [circumstances, status] {
            let military = self.keywords.military.first_match(text);
            let negotiated = self.keywords.negotiated.first_match(text);
            match (military, negotiated) {
                (Some(m), Some(n)) if m < n => return (ReleaseMethod::Military, MethodBasis::Keyword),
                (Some(_), Some(_)) => return (ReleaseMethod::Negotiated, MethodBasis::Keyword),
                (Some(_), None) => return (ReleaseMethod::Military, MethodBasis::Keyword),
                (None, Some(_)) => return (ReleaseMethod::Negotiated, MethodBasis::Keyword),
                (None, None) => {}
            }
        }

        let countries = record.countries.as_deref().map(normalize_text).unwrap_or_default();
        let bare_list = if circumstances.is_empty() { countries.as_str() } else { circumstances };
        if self.is_country_list(bare_list) {
            diagnostics.push(
                Stage::Classify,
                id,
                format!("no release keyword; bare country list {bare_list:?} read as negotiated"),
            );
            return (ReleaseMethod::Negotiated, MethodBasis::CountryList);
        }

        diagnostics.push(
            Stage::Classify,
            id,
            format!("release method unknown ({circumstances:?}); defaulted to negotiated"),
        );
        (ReleaseMethod::Negotiated, MethodBasis::Defaulted)
    }

    fn is_country_list(&self, text: &str) -> bool {
        let mut parts = country_separator_re()
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .peekable();
        if parts.peek().is_none() {
            return false;
        }
        parts.all(|p| {
            self.cfg
                .country_names
                .iter()
                .any(|c| normalize_text(c) == p)
        })
    }
}

fn journey_type(initial: LaneId, events: &[Event], final_lane: LaneId) -> JourneyType {
    if initial == LaneId::DeceasedAtStart {
        return JourneyType::DeadFromStart;
    }
    if final_lane.is_released() {
        return match final_lane.vitality() {
            Vitality::Deceased => JourneyType::ReleasedBody,
            Vitality::Living => JourneyType::ReleasedAlive,
        };
    }
    if events.iter().any(|e| e.kind == EventKind::Died) {
        return JourneyType::DiedInCaptivity;
    }
    JourneyType::StillCaptive
}

fn check_invariants(ind: &Individual) -> Result<(), ClassifyError> {
    if !matches!(ind.initial_lane, LaneId::AliveAtStart | LaneId::DeceasedAtStart) {
        return Err(ClassifyError::InitialLane {
            lane: ind.initial_lane,
        });
    }
    for pair in ind.events.windows(2) {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(ClassifyError::EventOrder {
                lane: pair[1].lane,
                at: pair[1].timestamp,
            });
        }
        if pair[1].lane == pair[0].lane {
            return Err(ClassifyError::RepeatedLane { lane: pair[1].lane });
        }
    }
    Ok(())
}

/// Classifies a batch with a fresh classifier.
pub fn classify_all(
    records: &[RawRecord],
    cfg: &ClassifyConfig,
    diagnostics: &mut Diagnostics,
) -> Vec<Individual> {
    StateClassifier::new(cfg).classify_all(records, diagnostics)
}
