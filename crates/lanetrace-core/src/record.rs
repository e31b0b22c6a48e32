use serde::{Deserialize, Deserializer, Serialize};

/// One input row, validated once at ingestion.
///
/// Optional text fields are `None` when the source cell is blank or carries one of the
/// spreadsheet null spellings (`nan`, `None`, `N/A`, ...); downstream stages never see those.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub initial_status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub current_status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub death_date: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub death_context: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub circumstances: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub captivity_summary: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub countries: Option<String>,
}

const NULL_SPELLINGS: &[&str] = &["nan", "none", "null", "n/a", "na", "-", "unknown date"];

/// Normalizes a raw cell to `None` when it carries no information.
pub fn clean_text(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    let lower = t.to_ascii_lowercase();
    if NULL_SPELLINGS.contains(&lower.as_str()) {
        return None;
    }
    Some(t.to_string())
}

fn de_opt_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(clean_text))
}

impl RawRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn status(mut self, v: &str) -> Self {
        self.current_status = clean_text(v);
        self
    }

    pub fn initial_status(mut self, v: &str) -> Self {
        self.initial_status = clean_text(v);
        self
    }

    pub fn release_date(mut self, v: &str) -> Self {
        self.release_date = clean_text(v);
        self
    }

    pub fn death_date(mut self, v: &str) -> Self {
        self.death_date = clean_text(v);
        self
    }

    pub fn death_context(mut self, v: &str) -> Self {
        self.death_context = clean_text(v);
        self
    }

    pub fn circumstances(mut self, v: &str) -> Self {
        self.circumstances = clean_text(v);
        self
    }

    pub fn captivity_summary(mut self, v: &str) -> Self {
        self.captivity_summary = clean_text(v);
        self
    }

    pub fn countries(mut self, v: &str) -> Self {
        self.countries = clean_text(v);
        self
    }
}
