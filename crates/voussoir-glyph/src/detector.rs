//! Glyph detection on full photographs.

use crate::candidates::{find_candidates, CandidateParams};
use crate::codebook::{Glyph, Rotation, GLYPH_CODEBOOK};
use crate::decode::{DecodeParams, GlyphDecoder};
use crate::matcher::Matcher;
use log::{debug, trace};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use voussoir_core::quad::{contains_point, diagonal_intersection};
use voussoir_core::ImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Detector configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    pub candidates: CandidateParams,
    pub decode: DecodeParams,
    /// Minimum confidence, `border_score × (1 − hamming / 16)`.
    pub min_score: f32,
    /// Collapse overlapping detections of the same glyph to the best one.
    pub dedup_overlapping: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            candidates: CandidateParams::default(),
            decode: DecodeParams::default(),
            min_score: 0.75,
            dedup_overlapping: true,
        }
    }
}

/// One decoded glyph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub glyph: Glyph,
    /// Projective centre of the glyph, in pixel-area coordinates.
    pub centroid: Point2<f32>,
    /// Glyph outer corners in canonical order (TL, TR, BR, BL of the glyph
    /// artwork), clockwise on screen.
    pub corners: [Point2<f32>; 4],
    pub rotation: Rotation,
    pub hamming: u8,
    pub border_score: f32,
    /// Confidence in `[0, 1]`.
    pub score: f32,
    /// Observed data bits (row-major, black = 1) in the sampled frame.
    pub code: u64,
}

impl MarkerDetection {
    #[inline]
    pub fn id(&self) -> u8 {
        self.glyph.id()
    }
}

/// Finds the eight book-spread glyphs in an image.
#[derive(Clone, Debug)]
pub struct GlyphDetector {
    params: DetectorParams,
    matcher: Matcher,
}

impl Default for GlyphDetector {
    fn default() -> Self {
        Self::new(DetectorParams::default())
    }
}

impl GlyphDetector {
    pub fn new(params: DetectorParams) -> Self {
        let matcher = Matcher::new(GLYPH_CODEBOOK, params.decode.max_hamming);
        Self { params, matcher }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Detect glyphs in an image with 1, 3 or 4 channels.
    ///
    /// Unrecognised candidates are dropped; glyph ids are never guessed.
    /// Output is sorted by glyph id, best score first within an id.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(w = image.width, h = image.height))
    )]
    pub fn detect(&self, image: &ImageView<'_>) -> Vec<MarkerDetection> {
        let gray = image.to_gray();
        let candidates = find_candidates(&gray, &self.params.candidates);
        let decoder = GlyphDecoder::new(&self.params.decode);
        let view = gray.view();

        let mut out = Vec::new();
        for cand in &candidates {
            match self.decode_with(&decoder, &view, &cand.corners) {
                Some(det) => out.push(det),
                None => trace!("candidate at {:?} did not decode", cand.corners[0]),
            }
        }

        if self.params.dedup_overlapping {
            out = dedup_overlapping(out);
        }
        out.sort_by(|a, b| {
            a.glyph
                .cmp(&b.glyph)
                .then(b.score.total_cmp(&a.score))
        });

        debug!(
            "glyph detection: {} candidates, {} detections [{}]",
            candidates.len(),
            out.len(),
            out.iter()
                .map(|d| d.glyph.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        out
    }

    /// Decode a glyph from a known quad (clockwise on screen, any start corner).
    pub fn decode_quad(
        &self,
        gray: &ImageView<'_>,
        quad: &[Point2<f32>; 4],
    ) -> Option<MarkerDetection> {
        let decoder = GlyphDecoder::new(&self.params.decode);
        self.decode_with(&decoder, gray, quad)
    }

    fn decode_with(
        &self,
        decoder: &GlyphDecoder,
        gray: &ImageView<'_>,
        quad: &[Point2<f32>; 4],
    ) -> Option<MarkerDetection> {
        let obs = decoder.decode(gray, quad)?;
        let code = obs.grid.data_code();
        let m = self
            .matcher
            .classify(&obs.grid, self.params.decode.min_border_score)?;

        let bits = GLYPH_CODEBOOK.bit_count() as f32;
        let score = (obs.border_score * (1.0 - m.hamming as f32 / bits)).clamp(0.0, 1.0);
        if score < self.params.min_score {
            trace!("glyph {} rejected: score {score:.3}", m.glyph);
            return None;
        }

        let r = m.rotation.quarter_turns() as usize;
        let corners = [0, 1, 2, 3].map(|k| quad[(k + r) % 4]);
        let centroid = diagonal_intersection(quad).unwrap_or_else(|| {
            let c = quad.iter().map(|p| p.coords).sum::<nalgebra::Vector2<f32>>() / 4.0;
            Point2::from(c)
        });

        Some(MarkerDetection {
            glyph: m.glyph,
            centroid,
            corners,
            rotation: m.rotation,
            hamming: m.hamming,
            border_score: obs.border_score,
            score,
            code,
        })
    }
}

/// Detect with default parameters.
pub fn detect(image: &ImageView<'_>) -> Vec<MarkerDetection> {
    GlyphDetector::default().detect(image)
}

/// Keep the best of each group of same-glyph detections whose quads overlap.
fn dedup_overlapping(mut dets: Vec<MarkerDetection>) -> Vec<MarkerDetection> {
    dets.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut out: Vec<MarkerDetection> = Vec::with_capacity(dets.len());
    for d in dets {
        let overlaps = out.iter().any(|k| {
            k.glyph == d.glyph
                && (contains_point(&k.corners, d.centroid) || contains_point(&d.corners, k.centroid))
        });
        if !overlaps {
            out.push(d);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{blank, paint_glyph, square};

    fn det(glyph: Glyph, corners: [Point2<f32>; 4], score: f32) -> MarkerDetection {
        MarkerDetection {
            glyph,
            centroid: diagonal_intersection(&corners).unwrap(),
            corners,
            rotation: Rotation::R0,
            hamming: 0,
            border_score: 1.0,
            score,
            code: glyph.code(),
        }
    }

    #[test]
    fn dedup_keeps_best_of_overlapping_only() {
        let dets = vec![
            det(Glyph::LeftBottomRight, square(10.0, 10.0, 40.0), 0.8),
            det(Glyph::LeftBottomRight, square(12.0, 11.0, 40.0), 0.95),
            det(Glyph::LeftBottomRight, square(300.0, 10.0, 40.0), 0.9),
            det(Glyph::LeftTopLeft, square(11.0, 10.0, 40.0), 0.85),
        ];
        let out = dedup_overlapping(dets);
        assert_eq!(out.len(), 3);
        let twos: Vec<_> = out
            .iter()
            .filter(|d| d.glyph == Glyph::LeftBottomRight)
            .map(|d| d.score)
            .collect();
        assert_eq!(twos, vec![0.95, 0.9]);
    }

    #[test]
    fn decode_quad_reports_canonical_corners() {
        let mut img = blank(120, 120, 1, 235);
        let q = square(30.0, 30.0, 48.0);
        paint_glyph(&mut img, Glyph::RightTopRight, &q, 15, 235, 1).unwrap();

        let detector = GlyphDetector::default();
        let start_bottom_left = [q[3], q[0], q[1], q[2]];
        let d = detector
            .decode_quad(&img.view(), &start_bottom_left)
            .expect("decode");
        assert_eq!(d.glyph, Glyph::RightTopRight);
        assert_eq!(d.rotation, Rotation::R90);
        assert_eq!(d.corners, q);
        assert_eq!(d.score, 1.0);
        assert!((d.centroid - Point2::new(54.0, 54.0)).norm() < 1e-3);
    }
}
