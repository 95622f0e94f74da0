//! JSON run configuration.

use crate::{EdgeOffsets, PageSpec};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use voussoir_glyph::{DetectorParams, PageSide};

#[derive(thiserror::Error, Debug)]
pub enum PageIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Settings for one output page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SideConfig {
    /// Output file; `None` disables the side.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub offsets: EdgeOffsets,
}

/// Everything needed to process one spread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub input_image: String,
    #[serde(default)]
    pub page: PageSpec,
    #[serde(default)]
    pub left: SideConfig,
    #[serde(default)]
    pub right: SideConfig,
    #[serde(default)]
    pub detector: DetectorParams,
    /// Replace existing output files instead of refusing to write.
    #[serde(default)]
    pub overwrite: bool,
}

impl RunConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PageIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PageIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn side(&self, side: PageSide) -> &SideConfig {
        match side {
            PageSide::Left => &self.left,
            PageSide::Right => &self.right,
        }
    }

    pub fn wants(&self, side: PageSide) -> bool {
        self.side(side).output.is_some()
    }
}

/// Load detector parameters from JSON. Missing fields take their defaults.
pub fn load_detector_params(path: impl AsRef<Path>) -> Result<DetectorParams, PageIoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let cfg = RunConfig {
            input_image: "spread.jpg".into(),
            page: PageSpec {
                width: 5.5,
                height: 8.5,
                dpi: 300.0,
            },
            left: SideConfig {
                output: Some("left.png".into()),
                offsets: EdgeOffsets {
                    left: 0.25,
                    ..EdgeOffsets::default()
                },
            },
            right: SideConfig::default(),
            detector: DetectorParams::default(),
            overwrite: false,
        };
        cfg.write_json(&path).unwrap();
        let back = RunConfig::load_json(&path).unwrap();
        assert_eq!(back, cfg);
        assert!(back.wants(PageSide::Left));
        assert!(!back.wants(PageSide::Right));
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: RunConfig = serde_json::from_str(r#"{ "input_image": "a.png" }"#).unwrap();
        assert_eq!(cfg.page, PageSpec::default());
        assert_eq!(cfg.detector, DetectorParams::default());
        assert_eq!(cfg.left.offsets, EdgeOffsets::default());
    }
}
