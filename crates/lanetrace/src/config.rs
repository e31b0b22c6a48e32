use lanetrace_core::{ClassifyConfig, ColumnMap, LaneId, LaneRegistry};
use lanetrace_render::{FlowConfig, GeometryConfig, LayoutConfig, PaletteConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pixel frame the timeline is drawn into. Time runs right to left: the start instant sits at
/// `width - margin_right`, "now" at `margin_left`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            margin_left: 160.0,
            margin_right: 40.0,
            margin_bottom: 20.0,
        }
    }
}

impl Viewport {
    pub fn x_start(&self) -> f64 {
        self.width - self.margin_right
    }

    pub fn x_now(&self) -> f64 {
        self.margin_left
    }

    pub fn validate(&self, margin_top: f64) -> lanetrace_render::Result<()> {
        let drawable = self.drawable_height(margin_top);
        if !(self.width.is_finite() && drawable.is_finite()) || drawable <= 0.0 {
            return Err(lanetrace_render::Error::InvalidConfig {
                message: format!(
                    "viewport {}x{} leaves no drawable height",
                    self.width, self.height
                ),
            });
        }
        Ok(())
    }

    pub fn drawable_height(&self, margin_top: f64) -> f64 {
        self.height - margin_top - self.margin_bottom
    }
}

/// Label/priority override for one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneOverride {
    pub id: LaneId,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub columns: ColumnMap,
    pub classify: ClassifyConfig,
    pub lanes: Vec<LaneOverride>,
    pub layout: LayoutConfig,
    pub geometry: GeometryConfig,
    pub palette: PaletteConfig,
    pub flow: FlowConfig,
    pub viewport: Viewport,
}

impl PipelineConfig {
    pub fn from_json_str(text: &str) -> lanetrace_core::Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.classify.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> lanetrace_core::Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.classify.validate()?;
        Ok(cfg)
    }

    /// Picks the format from the extension (`.yaml`/`.yml`, else JSON).
    pub fn load(path: &Path) -> lanetrace_core::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| lanetrace_core::Error::InvalidConfig {
            message: format!("failed to read {}: {err}", path.display()),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    /// The default lanes with the configured overrides applied.
    pub fn registry(&self) -> LaneRegistry {
        self.lanes
            .iter()
            .fold(LaneRegistry::default(), |reg, o| {
                let reg = match &o.label {
                    Some(label) => reg.with_label(o.id, label.clone()),
                    None => reg,
                };
                match o.priority {
                    Some(p) => reg.with_priority(o.id, p),
                    None => reg,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let cfg = PipelineConfig::from_yaml_str(
            r#"
classify:
  now: 2025-10-18
viewport:
  width: 900
lanes:
  - id: still-held-living
    label: Held
    priority: 0
"#,
        )
        .unwrap();
        assert_eq!(cfg.viewport.width, 900.0);
        assert_eq!(cfg.viewport.height, Viewport::default().height);
        assert_eq!(cfg.geometry, GeometryConfig::default());
        let reg = cfg.registry();
        assert_eq!(reg.get(LaneId::StillHeldLiving).label, "Held");
        assert_eq!(reg.sorted()[0].id, LaneId::StillHeldLiving);
    }

    #[test]
    fn json_config_is_validated() {
        let err = PipelineConfig::from_json_str(r#"{"classify": {"now": "2020-01-01"}}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("must be after start"), "{err}");
    }

    #[test]
    fn viewport_without_room_is_rejected() {
        let vp = Viewport {
            height: 30.0,
            ..Viewport::default()
        };
        assert!(vp.validate(20.0).is_err());
        assert!(Viewport::default().validate(20.0).is_ok());
    }
}
