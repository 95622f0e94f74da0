//! Page size estimation from the apparent size of the glyphs.
//!
//! The four glyph centres of a side are mapped onto the unit square. Each
//! glyph then appears `glyph_size / d` wide in that frame, `d` being the
//! distance between glyph centres, which gives one estimate per glyph edge.
//! Glyphs straddle the page edges, so the page is `d − glyph_size` wide
//! and `d + glyph_size` tall.

use crate::{assemble_side, DetectionFailure};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use voussoir_core::homography_from_4pt;
use voussoir_glyph::{Corner, MarkerDetection, PageSide};

/// Printed glyph side length, in inches.
pub const DEFAULT_GLYPH_SIZE: f64 = 0.5;

/// Estimated page size, in the unit of `glyph_size`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSizeEstimate {
    pub width: f64,
    pub height: f64,
    /// Standard deviation of the individual estimates.
    pub width_std: f64,
    pub height_std: f64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error(transparent)]
    Detection(#[from] DetectionFailure),
    #[error("glyph centres of the {0} page do not span a quadrilateral")]
    Degenerate(PageSide),
}

pub fn estimate_page_size(
    detections: &[MarkerDetection],
    side: PageSide,
    glyph_size: f64,
) -> Result<PageSizeEstimate, EstimateError> {
    let corners = assemble_side(detections, side)?;
    let unit = [
        Point2::new(0.0f32, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    let h = homography_from_4pt(&corners.centroids, &unit).ok_or(EstimateError::Degenerate(side))?;

    let mut widths = Vec::with_capacity(8);
    let mut heights = Vec::with_capacity(8);
    for corner in Corner::ALL {
        let Some(d) = detections
            .iter()
            .find(|d| d.glyph.side() == side && d.glyph.corner() == corner)
        else {
            continue;
        };
        let q = d.corners.map(|p| h.apply_f64(Point2::new(p.x as f64, p.y as f64)));
        widths.push((q[1] - q[0]).norm());
        widths.push((q[2] - q[3]).norm());
        heights.push((q[3] - q[0]).norm());
        heights.push((q[2] - q[1]).norm());
    }

    let to_size = |v: &[f64]| -> Option<(f64, f64)> {
        let mean = v.iter().sum::<f64>() / v.len() as f64;
        if !(mean.is_finite() && mean > 0.0) {
            return None;
        }
        let each: Vec<f64> = v.iter().map(|x| glyph_size / x).collect();
        let m = each.iter().sum::<f64>() / each.len() as f64;
        let var = each.iter().map(|x| (x - m).powi(2)).sum::<f64>() / each.len() as f64;
        Some((glyph_size / mean, var.sqrt()))
    };

    let (across, width_std) = to_size(&widths).ok_or(EstimateError::Degenerate(side))?;
    let (down, height_std) = to_size(&heights).ok_or(EstimateError::Degenerate(side))?;
    Ok(PageSizeEstimate {
        width: across - glyph_size,
        height: down + glyph_size,
        width_std,
        height_std,
    })
}
