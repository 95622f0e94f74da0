//! Cell sampling and binarisation of a glyph quad.

use crate::codebook::{BitGrid, GRID_CELLS};
use crate::threshold::otsu_threshold_from_samples;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use voussoir_core::{homography_from_4pt, sample_bilinear, Homography, ImageView};

/// Sampling and acceptance knobs for one glyph quad.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeParams {
    /// Samples per cell along each axis.
    pub samples_per_cell: usize,
    /// Extent of the per-cell sample grid as a fraction of the cell side.
    pub sample_spread: f32,
    /// Require border-black ratio >= this.
    pub min_border_score: f32,
    /// Maximum data cells allowed to disagree with the codebook.
    pub max_hamming: u8,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            samples_per_cell: 3,
            sample_spread: 0.5,
            min_border_score: 0.85,
            max_hamming: 2,
        }
    }
}

/// Binarised cells read from one quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphObservation {
    pub grid: BitGrid,
    pub border_score: f32,
    pub threshold: u8,
}

/// Sample positions in canonical glyph units (one unit per cell).
struct SampleGrid {
    per_cell: usize,
    points: Vec<Point2<f32>>, // cell-major: (cy * cells + cx) * per_cell² + sub
    threshold_points: Vec<Point2<f32>>,
}

impl SampleGrid {
    fn new(params: &DecodeParams) -> Self {
        let k = params.samples_per_cell.max(1);
        let spread = params.sample_spread.clamp(0.0, 1.0);
        let mut points = Vec::with_capacity(GRID_CELLS * GRID_CELLS * k * k);
        for cy in 0..GRID_CELLS {
            for cx in 0..GRID_CELLS {
                for sy in 0..k {
                    for sx in 0..k {
                        let ox = ((sx as f32 + 0.5) / k as f32 - 0.5) * spread;
                        let oy = ((sy as f32 + 0.5) / k as f32 - 0.5) * spread;
                        points.push(Point2::new(cx as f32 + 0.5 + ox, cy as f32 + 0.5 + oy));
                    }
                }
            }
        }

        Self {
            per_cell: k * k,
            points,
            threshold_points: build_threshold_points(GRID_CELLS as f32, GRID_CELLS),
        }
    }
}

/// Reads the 6×6 cell grid of a glyph quad from a grayscale image.
pub struct GlyphDecoder {
    min_border_score: f32,
    grid: SampleGrid,
}

impl GlyphDecoder {
    pub fn new(params: &DecodeParams) -> Self {
        Self {
            min_border_score: params.min_border_score,
            grid: SampleGrid::new(params),
        }
    }

    /// Sample and binarise the quad whose corners (clockwise on screen) are
    /// given in pixel-area coordinates.
    pub fn decode(
        &self,
        gray: &ImageView<'_>,
        quad: &[Point2<f32>; 4],
    ) -> Option<GlyphObservation> {
        if !gray.is_gray() || !quad_inside(gray, quad) {
            return None;
        }
        let h = glyph_to_image(quad)?;

        let mut cell_means = Vec::with_capacity(GRID_CELLS * GRID_CELLS);
        for cell in self.grid.points.chunks_exact(self.grid.per_cell) {
            let sum: f32 = cell.iter().map(|&p| sample(gray, &h, p)).sum();
            cell_means.push((sum / self.grid.per_cell as f32).round().clamp(0.0, 255.0) as u8);
        }

        let thr_samples: Vec<u8> = self
            .grid
            .threshold_points
            .iter()
            .map(|&p| sample(gray, &h, p).round().clamp(0.0, 255.0) as u8)
            .collect();

        decode_samples(&cell_means, &thr_samples, self.min_border_score)
    }
}

/// Map from the canonical `6 × 6` glyph square to the image quad.
pub(crate) fn glyph_to_image(quad: &[Point2<f32>; 4]) -> Option<Homography> {
    let s = GRID_CELLS as f32;
    let canonical = [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ];
    homography_from_4pt(&canonical, quad)
}

#[inline]
fn sample(gray: &ImageView<'_>, h: &Homography, p: Point2<f32>) -> f32 {
    let q = h.apply(p);
    sample_bilinear(gray, q.x, q.y, 0)
}

fn quad_inside(img: &ImageView<'_>, quad: &[Point2<f32>; 4]) -> bool {
    let (w, h) = (img.width as f32, img.height as f32);
    quad.iter()
        .all(|p| p.x >= 0.0 && p.y >= 0.0 && p.x <= w && p.y <= h)
}

fn decode_samples(
    cell_means: &[u8],
    thr_samples: &[u8],
    min_border_score: f32,
) -> Option<GlyphObservation> {
    if cell_means.len() != GRID_CELLS * GRID_CELLS {
        return None;
    }

    let threshold = if thr_samples.is_empty() {
        otsu_threshold_from_samples(cell_means)
    } else {
        otsu_threshold_from_samples(thr_samples)
    };

    let mut grid = BitGrid::from_rows([[false; GRID_CELLS]; GRID_CELLS]);
    for cy in 0..GRID_CELLS {
        for cx in 0..GRID_CELLS {
            grid.set(cx, cy, cell_means[cy * GRID_CELLS + cx] < threshold);
        }
    }

    let border_score = grid.border_score();
    if border_score < min_border_score {
        return None;
    }

    Some(GlyphObservation {
        grid,
        border_score,
        threshold,
    })
}

fn build_threshold_points(side: f32, cells: usize) -> Vec<Point2<f32>> {
    const THRESH_SUBDIV: usize = 3;
    let grid = cells * THRESH_SUBDIV;
    let step = side / grid as f32;
    let mut points = Vec::with_capacity(grid * grid);
    for ty in 0..grid {
        for tx in 0..grid {
            points.push(Point2::new(
                (tx as f32 + 0.5) * step,
                (ty as f32 + 0.5) * step,
            ));
        }
    }
    points
}
