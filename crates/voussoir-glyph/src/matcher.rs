//! Codebook matching.

use crate::codebook::{rotate_code, BitGrid, Codebook, Glyph, Rotation};
use serde::{Deserialize, Serialize};

/// A codebook match for an observed data code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub glyph: Glyph,
    /// Turn such that `observed == rotate(code, rotation)`.
    pub rotation: Rotation,
    /// Data cells that disagree with the codebook after rotation.
    pub hamming: u8,
}

/// Brute-force matcher over all glyphs and rotations.
#[derive(Clone, Debug)]
pub struct Matcher {
    codebook: Codebook,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// `max_hamming` is capped at the codebook's correction capacity so that
    /// a match is never ambiguous.
    pub fn new(codebook: Codebook, max_hamming: u8) -> Self {
        let n = codebook.marker_size;
        let rotated = codebook
            .codes
            .iter()
            .map(|&base| [0, 1, 2, 3].map(|rot| rotate_code(base, n, rot)))
            .collect();

        Self {
            codebook,
            max_hamming: max_hamming.min(codebook.max_correction_bits()),
            rotated,
        }
    }

    #[inline]
    pub fn codebook(&self) -> Codebook {
        self.codebook
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within `max_hamming`, if any.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<(usize, u8, u8)> = None;

        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = (observed ^ cand).count_ones() as u8;
                if h > self.max_hamming {
                    continue;
                }
                if best.is_none_or(|(_, _, prev)| h < prev) {
                    best = Some((id, rot as u8, h));
                }
            }
        }

        let (id, rot, hamming) = best?;
        Some(Match {
            glyph: Glyph::from_id(id as u8)?,
            rotation: Rotation::from_quarter_turns(rot),
            hamming,
        })
    }

    /// Classify a binarised cell grid whose black-border ratio is at least
    /// `min_border_score`.
    pub fn classify(&self, grid: &BitGrid, min_border_score: f32) -> Option<Match> {
        if grid.border_score() < min_border_score {
            return None;
        }
        self.match_code(grid.data_code())
    }
}

impl Default for Matcher {
    fn default() -> Self {
        let codebook = crate::GLYPH_CODEBOOK;
        Self::new(codebook, codebook.max_correction_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::{DATA_BITS, GLYPH_CODEBOOK};

    fn data_cells() -> Vec<(usize, usize)> {
        (1..=DATA_BITS)
            .flat_map(|y| (1..=DATA_BITS).map(move |x| (x, y)))
            .collect()
    }

    #[test]
    fn finds_every_glyph_in_every_rotation() {
        let matcher = Matcher::default();
        for g in Glyph::ALL {
            for rot in Rotation::ALL {
                let grid = g.bit_pattern().rotated(rot);
                let m = matcher.classify(&grid, 1.0).expect("match");
                assert_eq!((m.glyph, m.rotation, m.hamming), (g, rot, 0));
            }
        }
    }

    #[test]
    fn any_two_flips_still_decode() {
        let matcher = Matcher::default();
        let cells = data_cells();
        for g in Glyph::ALL {
            for rot in Rotation::ALL {
                let base = g.bit_pattern().rotated(rot);
                for (i, &(x1, y1)) in cells.iter().enumerate() {
                    for &(x2, y2) in &cells[i..] {
                        let mut grid = base;
                        grid.flip(x1, y1);
                        if (x1, y1) != (x2, y2) {
                            grid.flip(x2, y2);
                        }
                        let m = matcher.classify(&grid, 1.0).expect("within correction");
                        assert_eq!((m.glyph, m.rotation), (g, rot));
                    }
                }
            }
        }
    }

    #[test]
    fn three_flips_never_decode() {
        let matcher = Matcher::default();
        let cells = data_cells();
        for g in Glyph::ALL {
            let base = g.bit_pattern();
            for a in 0..cells.len() {
                for b in (a + 1)..cells.len() {
                    for c in (b + 1)..cells.len() {
                        let mut grid = base;
                        for &(x, y) in [cells[a], cells[b], cells[c]].iter() {
                            grid.flip(x, y);
                        }
                        assert_eq!(matcher.classify(&grid, 1.0), None);
                    }
                }
            }
        }
    }

    #[test]
    fn blank_and_solid_interiors_do_not_match() {
        let matcher = Matcher::default();
        assert_eq!(matcher.match_code(0), None);
        assert_eq!(matcher.match_code(0xffff), None);
    }

    #[test]
    fn broken_border_is_rejected_by_classify() {
        let matcher = Matcher::default();
        let mut grid = Glyph::RightTopLeft.bit_pattern();
        grid.set(0, 3, false);
        assert_eq!(matcher.classify(&grid, 1.0), None);
        assert!(matcher.match_code(grid.data_code()).is_some());
    }

    #[test]
    fn border_tolerance_admits_one_broken_cell() {
        let matcher = Matcher::default();
        let mut grid = Glyph::LeftBottomLeft.bit_pattern();
        grid.set(5, 2, false);
        assert_eq!(grid.border_score(), 0.95);
        assert_eq!(matcher.classify(&grid, 1.0), None);
        let m = matcher.classify(&grid, 0.85).expect("within tolerance");
        assert_eq!((m.glyph, m.hamming), (Glyph::LeftBottomLeft, 0));
        grid.set(0, 1, false);
        grid.set(2, 0, false);
        grid.set(3, 5, false);
        assert_eq!(matcher.classify(&grid, 0.85), None);
    }

    #[test]
    fn max_hamming_is_capped() {
        let matcher = Matcher::new(GLYPH_CODEBOOK, 7);
        assert_eq!(matcher.max_hamming(), 2);
    }
}
