//! Fiducial glyphs for book-spread photographs.
//!
//! Eight fixed 6×6 glyphs mark the corners of the two pages of a spread.
//! This crate holds the codebook, the matcher, and a detector that finds the
//! glyphs in a photograph:
//!
//! 1. [`candidates`] finds convex, glyph-sized quads (no code knowledge),
//! 2. [`GlyphDecoder`] samples the 6×6 cells through a per-quad homography,
//! 3. [`Matcher`] classifies the cell grid against the codebook,
//! 4. [`GlyphDetector`] scores, filters and de-duplicates the results.
//!
//! ```no_run
//! use voussoir_core::ImageView;
//! use voussoir_glyph::GlyphDetector;
//!
//! # fn run(data: &[u8]) {
//! let view = ImageView::new(1600, 1200, 1, data).unwrap();
//! for det in GlyphDetector::default().detect(&view) {
//!     println!("glyph {} at {:?}", det.glyph, det.centroid);
//! }
//! # }
//! ```

pub mod candidates;
mod codebook;
mod decode;
mod detector;
mod matcher;
pub mod synth;
mod threshold;

pub use candidates::{Candidate, CandidateParams};
pub use codebook::{
    rotate_code, BitGrid, Codebook, Corner, Glyph, PageSide, Rotation, BORDER_BITS, DATA_BITS,
    GLYPH_CODEBOOK, GRID_CELLS,
};
pub use decode::{DecodeParams, GlyphDecoder, GlyphObservation};
pub use detector::{detect, DetectorParams, GlyphDetector, MarkerDetection};
pub use matcher::{Match, Matcher};
pub use threshold::adaptive_threshold_inv;
