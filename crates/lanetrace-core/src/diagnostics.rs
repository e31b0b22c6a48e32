//! Append-only diagnostics channel shared by every pipeline stage.
//!
//! Diagnostics are data, not control flow: a stage records what it recovered from and moves on.
//! Each push is mirrored as a `tracing` event so hosts that install a subscriber can follow along.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Ingest,
    Date,
    Classify,
    Layout,
    Geometry,
    Color,
    Aggregate,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Date => "date",
            Stage::Classify => "classify",
            Stage::Layout => "layout",
            Stage::Geometry => "geometry",
            Stage::Color => "color",
            Stage::Aggregate => "aggregate",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub individual_id: Option<String>,
    pub stage: Stage,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.individual_id {
            Some(id) => write!(f, "[{}] {}: {}", self.stage, id, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Stage, individual_id: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(
            stage = stage.as_str(),
            individual = individual_id.unwrap_or("-"),
            "{message}"
        );
        self.0.push(Diagnostic {
            individual_id: individual_id.map(str::to_string),
            stage,
            message,
        });
    }

    /// Appends every entry of `other`, preserving order.
    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn for_individual<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.0
            .iter()
            .filter(move |d| d.individual_id.as_deref() == Some(id))
    }

    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.0.iter().filter(move |d| d.stage == stage)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
