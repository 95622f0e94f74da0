//! End-to-end page rendering: detect, assemble, rectify, encode.

use crate::convert::load_image;
use crate::encode::{check_input_path, write_image, EncodeError};
use log::{info, warn};
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use voussoir_core::Image;
use voussoir_glyph::{DetectorParams, GlyphDetector, MarkerDetection, PageSide};
use voussoir_page::{
    rectify_side, ConfigurationError, EdgeOffsets, PageError, PageIoError, PageLayout,
    PageSizeEstimate, PageSpec, RunConfig,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors that stop a run before any page is attempted.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigurationError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error(transparent)]
    PageIo(#[from] PageIoError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Why one requested page was not written.
#[derive(thiserror::Error, Debug)]
pub enum SideError {
    #[error(transparent)]
    Page(#[from] PageError),
    #[error("{side} page: {source}")]
    Encode { side: PageSide, source: EncodeError },
}

/// Output file and crop adjustment for one page.
#[derive(Clone, Debug, PartialEq)]
pub struct SideRequest {
    pub output: PathBuf,
    pub offsets: EdgeOffsets,
}

/// What to produce from one spread.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderRequest {
    pub page: PageSpec,
    pub left: Option<SideRequest>,
    pub right: Option<SideRequest>,
    /// Replace existing output files.
    pub overwrite: bool,
}

impl RenderRequest {
    pub fn side(&self, side: PageSide) -> Option<&SideRequest> {
        match side {
            PageSide::Left => self.left.as_ref(),
            PageSide::Right => self.right.as_ref(),
        }
    }

    /// Build a request from a JSON run configuration.
    pub fn from_config(cfg: &RunConfig) -> Self {
        let side = |side: PageSide| {
            let sc = cfg.side(side);
            sc.output.as_ref().map(|out| SideRequest {
                output: PathBuf::from(out),
                offsets: sc.offsets,
            })
        };
        Self {
            page: cfg.page,
            left: side(PageSide::Left),
            right: side(PageSide::Right),
            overwrite: cfg.overwrite,
        }
    }

    /// Check page size, resolution and every requested side's offsets.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.page.validate()?;
        for side in PageSide::BOTH {
            if let Some(req) = self.side(side) {
                PageLayout::new(&self.page, &req.offsets)?;
            }
        }
        Ok(())
    }
}

/// Result for one side of the spread.
#[derive(Debug, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SideOutcome {
    NotRequested,
    Written {
        path: PathBuf,
        width: usize,
        height: usize,
        layout: PageLayout,
    },
    Failed(#[serde(serialize_with = "serialize_display")] SideError),
}

impl SideOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    pub fn error(&self) -> Option<&SideError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

fn serialize_display<S: Serializer, T: Display>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// Page size measured from one side's glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SideEstimate {
    pub side: PageSide,
    pub estimate: PageSizeEstimate,
}

/// Everything a run produced, serialisable as a JSON report.
#[derive(Debug, Serialize)]
pub struct RunReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    pub page: PageSpec,
    pub detections: Vec<MarkerDetection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub size_estimates: Vec<SideEstimate>,
    pub left: SideOutcome,
    pub right: SideOutcome,
}

impl RunReport {
    pub fn side(&self, side: PageSide) -> &SideOutcome {
        match side {
            PageSide::Left => &self.left,
            PageSide::Right => &self.right,
        }
    }

    /// At least one requested page was written.
    pub fn succeeded(&self) -> bool {
        self.left.is_written() || self.right.is_written()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SideError> {
        PageSide::BOTH
            .into_iter()
            .filter_map(|side| self.side(side).error())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Runs glyph detection and renders the requested pages.
#[derive(Clone, Debug, Default)]
pub struct PageRenderer {
    detector: GlyphDetector,
}

impl PageRenderer {
    pub fn new(params: DetectorParams) -> Self {
        Self {
            detector: GlyphDetector::new(params),
        }
    }

    pub fn detector(&self) -> &GlyphDetector {
        &self.detector
    }

    pub fn detect(&self, image: &Image) -> Vec<MarkerDetection> {
        let detections = self.detector.detect(&image.view());
        info!(
            "detected {} glyph(s): [{}]",
            detections.len(),
            detections
                .iter()
                .map(|d| d.glyph.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        detections
    }

    /// Detect glyphs in `image` and render every requested side.
    pub fn render(&self, image: &Image, request: &RenderRequest) -> RunReport {
        let detections = self.detect(image);
        self.render_detections(image, detections, request)
    }

    /// Render from detections that are already known.
    ///
    /// Sides are independent: a failure on one never prevents the other.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn render_detections(
        &self,
        image: &Image,
        detections: Vec<MarkerDetection>,
        request: &RenderRequest,
    ) -> RunReport {
        let outcome = |side: PageSide| match request.side(side) {
            None => SideOutcome::NotRequested,
            Some(req) => {
                let outcome = render_side(image, &detections, side, req, request);
                if let SideOutcome::Failed(e) = &outcome {
                    warn!("{e}");
                }
                outcome
            }
        };
        let left = outcome(PageSide::Left);
        let right = outcome(PageSide::Right);
        RunReport {
            input: None,
            page: request.page,
            detections,
            size_estimates: Vec::new(),
            left,
            right,
        }
    }

    /// Load `input`, then [`render`](Self::render) it.
    pub fn render_file(
        &self,
        input: &Path,
        request: &RenderRequest,
    ) -> Result<RunReport, RenderError> {
        check_input_path(input)?;
        request.validate()?;
        let image = load_image(input).map_err(|source| RenderError::Decode {
            path: input.to_path_buf(),
            source,
        })?;
        info!(
            "loaded {} ({}x{} px, {} channel(s))",
            input.display(),
            image.width,
            image.height,
            image.channels
        );
        let mut report = self.render(&image, request);
        report.input = Some(input.to_path_buf());
        Ok(report)
    }
}

fn render_side(
    image: &Image,
    detections: &[MarkerDetection],
    side: PageSide,
    req: &SideRequest,
    request: &RenderRequest,
) -> SideOutcome {
    let page = match rectify_side(&image.view(), detections, side, &request.page, &req.offsets) {
        Ok(page) => page,
        Err(e) => return SideOutcome::Failed(e.into()),
    };
    if let Err(source) = write_image(&req.output, &page.image, request.page.dpi, request.overwrite)
    {
        return SideOutcome::Failed(SideError::Encode { side, source });
    }
    info!(
        "{side} page: wrote {} ({}x{} px)",
        req.output.display(),
        page.image.width,
        page.image.height
    );
    SideOutcome::Written {
        path: req.output.clone(),
        width: page.image.width,
        height: page.image.height,
        layout: page.layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voussoir_page::SideConfig;

    #[test]
    fn request_from_config_skips_sides_without_output() {
        let cfg = RunConfig {
            input_image: "spread.png".into(),
            page: PageSpec::default(),
            left: SideConfig {
                output: Some("left.png".into()),
                offsets: EdgeOffsets {
                    top: 0.25,
                    ..EdgeOffsets::default()
                },
            },
            right: SideConfig::default(),
            detector: DetectorParams::default(),
            overwrite: true,
        };
        let req = RenderRequest::from_config(&cfg);
        assert_eq!(req.left.as_ref().unwrap().output, PathBuf::from("left.png"));
        assert_eq!(req.left.as_ref().unwrap().offsets.top, 0.25);
        assert!(req.right.is_none());
        assert!(req.overwrite);
    }

    #[test]
    fn offsets_that_empty_the_page_fail_validation() {
        let req = RenderRequest {
            page: PageSpec::default(),
            left: None,
            right: Some(SideRequest {
                output: "right.png".into(),
                offsets: EdgeOffsets {
                    left: 3.0,
                    right: 3.0,
                    ..EdgeOffsets::default()
                },
            }),
            overwrite: false,
        };
        assert!(matches!(
            req.validate(),
            Err(ConfigurationError::EmptyPage { .. })
        ));
    }

    #[test]
    fn blank_image_fails_every_requested_side() {
        let dir = tempfile::tempdir().unwrap();
        let req = RenderRequest {
            page: PageSpec::new(6.0, 9.5, 20.0).unwrap(),
            left: Some(SideRequest {
                output: dir.path().join("left.png"),
                offsets: EdgeOffsets::default(),
            }),
            right: None,
            overwrite: false,
        };
        let image = Image::new(64, 48, 3);
        let report = PageRenderer::default().render(&image, &req);
        assert!(!report.succeeded());
        assert!(matches!(report.right, SideOutcome::NotRequested));
        assert_eq!(report.failures().count(), 1);
        assert!(!dir.path().join("left.png").exists());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["right"]["status"], "not_requested");
        assert_eq!(json["left"]["status"], "failed");
        assert_eq!(
            json["left"]["detail"],
            "left page: missing glyph(s) 0, 1, 2, 3"
        );
    }
}
