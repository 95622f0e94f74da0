//! Physical page description and its pixel-space target rectangle.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use voussoir_glyph::Corner;

/// Highest supported output resolution.
pub const MAX_DPI: f64 = 1200.0;

/// Largest output raster, in pixels, that one page may allocate.
pub const MAX_PAGE_PIXELS: u64 = 1 << 30;

/// Physical page size (in any unit, typically inches) and output resolution
/// (pixels per that unit).
///
/// By default the page is cropped along the glyphs' inner vertical edges
/// and outer horizontal edges, so `width` runs between the inner edges of the
/// left and right glyphs and `height` between the top edge of the top glyphs
/// and the bottom edge of the bottom glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    pub width: f64,
    pub height: f64,
    pub dpi: f64,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            width: 6.0,
            height: 9.5,
            dpi: 600.0,
        }
    }
}

/// Per-edge crop adjustment in physical units. Positive moves that edge
/// inward, negative moves it outward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeOffsets {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Invalid page size, resolution or offsets.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("{name} must be a finite positive number, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("dpi must not exceed 1200, got {0}")]
    DpiTooLarge(f64),
    #[error("{name} offset is not a finite number")]
    NonFiniteOffset { name: &'static str },
    #[error("offsets leave an empty {width_px}x{height_px} px page")]
    EmptyPage { width_px: i64, height_px: i64 },
    #[error("a {width_px}x{height_px} px page exceeds the limit of 1073741824 pixels")]
    PageTooLarge { width_px: u64, height_px: u64 },
}

impl PageSpec {
    pub fn new(width: f64, height: f64, dpi: f64) -> Result<Self, ConfigurationError> {
        let spec = Self { width, height, dpi };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [("width", self.width), ("height", self.height), ("dpi", self.dpi)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigurationError::NotPositive { name, value });
            }
        }
        if self.dpi > MAX_DPI {
            return Err(ConfigurationError::DpiTooLarge(self.dpi));
        }
        Ok(())
    }
}

impl EdgeOffsets {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("left", self.left),
            ("right", self.right),
            ("top", self.top),
            ("bottom", self.bottom),
        ] {
            if !value.is_finite() {
                return Err(ConfigurationError::NonFiniteOffset { name });
            }
        }
        Ok(())
    }
}

/// Output raster for one page and where the four page corners marked by the
/// glyphs land in it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub width_px: usize,
    pub height_px: usize,
    /// Destination of the glyph-marked page corners, indexed by [`Corner`].
    pub anchors: [Point2<f32>; 4],
    pub dpi: f64,
}

impl PageLayout {
    /// ```
    /// use voussoir_page::{EdgeOffsets, PageLayout, PageSpec};
    ///
    /// let layout = PageLayout::new(&PageSpec::default(), &EdgeOffsets::default()).unwrap();
    /// assert_eq!((layout.width_px, layout.height_px), (3600, 5700));
    /// ```
    pub fn new(spec: &PageSpec, offsets: &EdgeOffsets) -> Result<Self, ConfigurationError> {
        spec.validate()?;
        offsets.validate()?;

        let dpi = spec.dpi;
        let w = ((spec.width - offsets.left - offsets.right) * dpi).round();
        let h = ((spec.height - offsets.top - offsets.bottom) * dpi).round();
        if !(w >= 1.0 && h >= 1.0) {
            return Err(ConfigurationError::EmptyPage {
                width_px: w as i64,
                height_px: h as i64,
            });
        }
        if w * h > MAX_PAGE_PIXELS as f64 {
            return Err(ConfigurationError::PageTooLarge {
                width_px: w as u64,
                height_px: h as u64,
            });
        }

        let x0 = -offsets.left * dpi;
        let y0 = -offsets.top * dpi;
        let x1 = (spec.width - offsets.left) * dpi;
        let y1 = (spec.height - offsets.top) * dpi;
        let anchors = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
            .map(|(x, y)| Point2::new(x as f32, y as f32));

        Ok(Self {
            width_px: w as usize,
            height_px: h as usize,
            anchors,
            dpi,
        })
    }

    #[inline]
    pub fn anchor(&self, corner: Corner) -> Point2<f32> {
        self.anchors[corner.index()]
    }

    /// The output rectangle `(0,0), (W,0), (W,H), (0,H)`.
    pub fn rectangle(&self) -> [Point2<f32>; 4] {
        let (w, h) = (self.width_px as f32, self.height_px as f32);
        [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_page_is_3600_by_5700() {
        let layout = PageLayout::new(&PageSpec::default(), &EdgeOffsets::default()).unwrap();
        assert_eq!((layout.width_px, layout.height_px), (3600, 5700));
        assert_eq!(layout.anchors, layout.rectangle());
    }

    #[test]
    fn left_offset_trims_only_the_left_edge() {
        let offsets = EdgeOffsets {
            left: 0.5,
            ..EdgeOffsets::default()
        };
        let layout = PageLayout::new(&PageSpec::default(), &offsets).unwrap();
        assert_eq!((layout.width_px, layout.height_px), (3300, 5700));
        assert_eq!(layout.anchor(Corner::TopLeft), Point2::new(-300.0, 0.0));
        assert_eq!(layout.anchor(Corner::TopRight), Point2::new(3300.0, 0.0));
        assert_eq!(layout.anchor(Corner::BottomRight), Point2::new(3300.0, 5700.0));
        assert_eq!(layout.anchor(Corner::BottomLeft), Point2::new(-300.0, 5700.0));
    }

    #[test]
    fn negative_offsets_grow_the_page() {
        let offsets = EdgeOffsets {
            top: -0.25,
            bottom: -0.25,
            ..EdgeOffsets::default()
        };
        let layout = PageLayout::new(&PageSpec::default(), &offsets).unwrap();
        assert_eq!(layout.height_px, 6000);
        assert_eq!(layout.anchor(Corner::TopLeft), Point2::new(0.0, 150.0));
    }

    #[test]
    fn rejects_bad_configuration() {
        let bad = |w, h, dpi| PageLayout::new(&PageSpec { width: w, height: h, dpi }, &EdgeOffsets::default());
        assert!(matches!(
            bad(0.0, 9.5, 600.0),
            Err(ConfigurationError::NotPositive { name: "width", .. })
        ));
        assert!(matches!(bad(6.0, f64::NAN, 600.0), Err(ConfigurationError::NotPositive { .. })));
        assert_eq!(bad(6.0, 9.5, 1200.5), Err(ConfigurationError::DpiTooLarge(1200.5)));
        assert!(bad(6.0, 9.5, 1200.0).is_ok());
        assert_eq!(
            bad(1.0e7, 9.5, 1200.0),
            Err(ConfigurationError::PageTooLarge {
                width_px: 12_000_000_000,
                height_px: 11_400,
            })
        );
        assert!(matches!(
            bad(f64::MAX, 9.5, 600.0),
            Err(ConfigurationError::PageTooLarge { width_px: u64::MAX, .. })
        ));
        assert!(matches!(bad(30.0, 30.0, 1200.0), Err(ConfigurationError::PageTooLarge { .. })));
        assert!(bad(20.0, 30.0, 1200.0).is_ok());

        let offsets = EdgeOffsets {
            left: 3.0,
            right: 3.0,
            ..EdgeOffsets::default()
        };
        assert!(matches!(
            PageLayout::new(&PageSpec::default(), &offsets),
            Err(ConfigurationError::EmptyPage { width_px: 0, .. })
        ));
    }
}
