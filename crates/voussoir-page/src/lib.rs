//! From glyph detections to flattened page images.
//!
//! - [`assemble`] groups detections into per-page corner sets,
//! - [`PageLayout`] turns a physical page description into a pixel raster,
//! - [`rectify_layout`] computes the page homography and resamples.

mod assemble;
mod error;
mod estimate;
mod io;
mod layout;
mod rectify;

pub use assemble::{
    assemble, assemble_side, page_corner_of_glyph, Assembly, DetectionFailure, PageCorners,
};
pub use error::PageError;
pub use estimate::{estimate_page_size, EstimateError, PageSizeEstimate, DEFAULT_GLYPH_SIZE};
pub use io::{load_detector_params, PageIoError, RunConfig, SideConfig};
pub use layout::{
    ConfigurationError, EdgeOffsets, PageLayout, PageSpec, MAX_DPI, MAX_PAGE_PIXELS,
};
pub use rectify::{page_homography, rectify, rectify_layout, rectify_side, RectifiedPage};
