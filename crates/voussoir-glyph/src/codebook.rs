//! The fixed glyph vocabulary.
//!
//! Every glyph is a 6×6 grid of square cells: a one-cell black border around
//! a 4×4 data area. Data bits are packed row-major (`idx = y * 4 + x`) with
//! **black = 1**.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cells per glyph side, border included.
pub const GRID_CELLS: usize = 6;
/// Data cells per glyph side.
pub const DATA_BITS: usize = 4;
/// Border width in cells.
pub const BORDER_BITS: usize = 1;

const BORDER_CELLS: usize = GRID_CELLS * GRID_CELLS - DATA_BITS * DATA_BITS;

/// Packed data codes, indexed by glyph id.
const GLYPH_CODES: [u64; 8] = [
    0xa20e, 0x95fe, 0x20eb, 0xac68, 0x7198, 0xfc9e, 0x5a1c, 0x2e57,
];

/// A fixed codebook of glyph codes.
#[derive(Clone, Copy, Debug)]
pub struct Codebook {
    pub name: &'static str,
    /// Data cells per side.
    pub marker_size: usize,
    /// Border width in cells.
    pub border_bits: usize,
    /// Guaranteed minimum Hamming distance over all codes and rotations.
    pub min_distance: u8,
    /// One code per glyph id, row-major, black = 1.
    pub codes: &'static [u64],
}

/// The 8-glyph codebook used on book spreads.
pub const GLYPH_CODEBOOK: Codebook = Codebook {
    name: "VOUSSOIR_4X4_8",
    marker_size: DATA_BITS,
    border_bits: BORDER_BITS,
    min_distance: 6,
    codes: &GLYPH_CODES,
};

impl Codebook {
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Cells per side, border included.
    #[inline]
    pub fn cells(&self) -> usize {
        self.marker_size + 2 * self.border_bits
    }

    /// Largest number of flipped data cells that still decodes unambiguously.
    #[inline]
    pub fn max_correction_bits(&self) -> u8 {
        self.min_distance.saturating_sub(1) / 2
    }

    /// Smallest Hamming distance between any two codes under any rotation,
    /// including a code against its own non-trivial rotations.
    pub fn min_pairwise_distance(&self) -> u32 {
        let n = self.marker_size;
        let mut best = u32::MAX;
        for (i, &a) in self.codes.iter().enumerate() {
            for rot in 1..4 {
                best = best.min((a ^ rotate_code(a, n, rot)).count_ones());
            }
            for &b in &self.codes[i + 1..] {
                for rot in 0..4 {
                    best = best.min((a ^ rotate_code(b, n, rot)).count_ones());
                }
            }
        }
        best
    }
}

/// Rotate a row-major `n × n` code clockwise (on screen) by `rot` quarter turns.
pub fn rotate_code(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = rotated_source(x, y, n, rot);
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

#[inline]
fn rotated_source(x: usize, y: usize, n: usize, rot: u8) -> (usize, usize) {
    match rot & 3 {
        0 => (x, y),
        1 => (y, n - 1 - x),
        2 => (n - 1 - x, n - 1 - y),
        _ => (n - 1 - y, x),
    }
}

/// Which page of the spread a glyph belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSide {
    Left,
    Right,
}

impl PageSide {
    pub const BOTH: [PageSide; 2] = [PageSide::Left, PageSide::Right];

    pub fn glyphs(self) -> [Glyph; 4] {
        Corner::ALL.map(|c| Glyph::from_role(self, c))
    }
}

impl fmt::Display for PageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageSide::Left => "left",
            PageSide::Right => "right",
        })
    }
}

/// Page corner, clockwise from the top-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One of the eight glyphs. Ids 0–3 frame the left page and 4–7 the right
/// page, each clockwise from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Glyph {
    LeftTopLeft,
    LeftTopRight,
    LeftBottomRight,
    LeftBottomLeft,
    RightTopLeft,
    RightTopRight,
    RightBottomRight,
    RightBottomLeft,
}

impl Glyph {
    pub const ALL: [Glyph; 8] = [
        Glyph::LeftTopLeft,
        Glyph::LeftTopRight,
        Glyph::LeftBottomRight,
        Glyph::LeftBottomLeft,
        Glyph::RightTopLeft,
        Glyph::RightTopRight,
        Glyph::RightBottomRight,
        Glyph::RightBottomLeft,
    ];

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn side(self) -> PageSide {
        if self.id() < 4 {
            PageSide::Left
        } else {
            PageSide::Right
        }
    }

    pub fn corner(self) -> Corner {
        Corner::ALL[(self.id() % 4) as usize]
    }

    pub fn from_role(side: PageSide, corner: Corner) -> Self {
        let base = match side {
            PageSide::Left => 0,
            PageSide::Right => 4,
        };
        Self::ALL[base + corner.index()]
    }

    #[inline]
    pub fn code(self) -> u64 {
        GLYPH_CODES[self.id() as usize]
    }

    /// Full 6×6 cell pattern, border included.
    pub fn bit_pattern(self) -> BitGrid {
        BitGrid::from_code(self.code())
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Clockwise quarter turn of an observed glyph relative to its canonical
/// orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[serde(rename = "0")]
    R0,
    #[serde(rename = "90")]
    R90,
    #[serde(rename = "180")]
    R180,
    #[serde(rename = "270")]
    R270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    pub fn from_quarter_turns(turns: u8) -> Self {
        Self::ALL[(turns & 3) as usize]
    }

    #[inline]
    pub fn quarter_turns(self) -> u8 {
        self as u8
    }

    pub fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }
}

/// Binarised 6×6 cell grid, `true` = black.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitGrid {
    cells: [[bool; GRID_CELLS]; GRID_CELLS], // [y][x]
}

impl BitGrid {
    pub fn from_rows(cells: [[bool; GRID_CELLS]; GRID_CELLS]) -> Self {
        Self { cells }
    }

    /// Black border around the given data code.
    pub fn from_code(code: u64) -> Self {
        let mut cells = [[true; GRID_CELLS]; GRID_CELLS];
        for (by, row) in cells[BORDER_BITS..BORDER_BITS + DATA_BITS]
            .iter_mut()
            .enumerate()
        {
            for (bx, cell) in row[BORDER_BITS..BORDER_BITS + DATA_BITS]
                .iter_mut()
                .enumerate()
            {
                *cell = (code >> (by * DATA_BITS + bx)) & 1 == 1;
            }
        }
        Self { cells }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.cells[y][x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, black: bool) {
        self.cells[y][x] = black;
    }

    pub fn flip(&mut self, x: usize, y: usize) {
        self.cells[y][x] = !self.cells[y][x];
    }

    #[inline]
    pub fn is_border(x: usize, y: usize) -> bool {
        x < BORDER_BITS
            || y < BORDER_BITS
            || x >= GRID_CELLS - BORDER_BITS
            || y >= GRID_CELLS - BORDER_BITS
    }

    /// Fraction of border cells that are black.
    pub fn border_score(&self) -> f32 {
        let mut black = 0usize;
        for y in 0..GRID_CELLS {
            for x in 0..GRID_CELLS {
                if Self::is_border(x, y) && self.cells[y][x] {
                    black += 1;
                }
            }
        }
        black as f32 / BORDER_CELLS as f32
    }

    /// Packed data bits (row-major, black = 1).
    pub fn data_code(&self) -> u64 {
        let mut code = 0u64;
        for by in 0..DATA_BITS {
            for bx in 0..DATA_BITS {
                if self.cells[by + BORDER_BITS][bx + BORDER_BITS] {
                    code |= 1 << (by * DATA_BITS + bx);
                }
            }
        }
        code
    }

    /// The grid turned clockwise by `rotation`.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        let rot = rotation.quarter_turns();
        let mut cells = [[false; GRID_CELLS]; GRID_CELLS];
        for (y, row) in cells.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                let (sx, sy) = rotated_source(x, y, GRID_CELLS, rot);
                *cell = self.cells[sy][sx];
            }
        }
        Self { cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codebook_keeps_minimum_distance_under_rotation() {
        assert!(GLYPH_CODEBOOK.min_pairwise_distance() >= GLYPH_CODEBOOK.min_distance as u32);
        assert_eq!(GLYPH_CODEBOOK.max_correction_bits(), 2);
    }

    #[test]
    fn rotate_four_times_is_identity() {
        for g in Glyph::ALL {
            let mut c = g.code();
            for _ in 0..4 {
                c = rotate_code(c, DATA_BITS, 1);
            }
            assert_eq!(c, g.code());
        }
    }

    #[test]
    fn quarter_turn_moves_top_left_to_top_right() {
        let code = 1u64; // only data cell (0, 0) is black
        let r = rotate_code(code, DATA_BITS, 1);
        assert_eq!(r, 1 << (DATA_BITS - 1));
    }

    #[test]
    fn grid_rotation_agrees_with_code_rotation() {
        for g in Glyph::ALL {
            for rot in Rotation::ALL {
                let grid = g.bit_pattern().rotated(rot);
                assert_eq!(
                    grid.data_code(),
                    rotate_code(g.code(), DATA_BITS, rot.quarter_turns())
                );
                assert_eq!(grid.border_score(), 1.0);
            }
        }
    }

    #[test]
    fn roles_round_trip() {
        for g in Glyph::ALL {
            assert_eq!(Glyph::from_role(g.side(), g.corner()), g);
            assert_eq!(Glyph::from_id(g.id()), Some(g));
        }
        assert_eq!(Glyph::from_id(8), None);
        assert_eq!(Glyph::from_id(2).unwrap().corner(), Corner::BottomRight);
        assert_eq!(Glyph::from_id(4).unwrap().side(), PageSide::Right);
        assert_eq!(
            PageSide::Right.glyphs().map(|g| g.id()),
            [4, 5, 6, 7]
        );
    }

    #[test]
    fn bit_pattern_has_black_border() {
        let grid = Glyph::LeftTopLeft.bit_pattern();
        for i in 0..GRID_CELLS {
            assert!(grid.get(i, 0) && grid.get(i, GRID_CELLS - 1));
            assert!(grid.get(0, i) && grid.get(GRID_CELLS - 1, i));
        }
        assert_eq!(grid.data_code(), Glyph::LeftTopLeft.code());
    }
}
