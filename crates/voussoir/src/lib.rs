//! De-keystone photographs of open books.
//!
//! Eight printed glyphs mark the corners of the two pages of a spread. This
//! crate finds them, maps each page quadrilateral onto a rectangle of the
//! requested physical size and resolution, and writes one image per page.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::path::Path;
//! use voussoir::page::{EdgeOffsets, PageSpec};
//! use voussoir::{PageRenderer, RenderRequest, SideRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let request = RenderRequest {
//!     page: PageSpec::new(6.0, 9.5, 300.0)?,
//!     left: Some(SideRequest {
//!         output: "left.png".into(),
//!         offsets: EdgeOffsets::default(),
//!     }),
//!     right: Some(SideRequest {
//!         output: "right.png".into(),
//!         offsets: EdgeOffsets::default(),
//!     }),
//!     overwrite: false,
//! };
//! let report = PageRenderer::default().render_file(Path::new("spread.jpg"), &request)?;
//! println!("wrote at least one page: {}", report.succeeded());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `voussoir::core`: image buffers, homographies, warping, quad checks, logging.
//! - `voussoir::glyph`: codebook, matcher and glyph detector.
//! - `voussoir::page`: page layout, glyph assembly, rectification, size estimation.
//! - [`encode`]: output validation and DPI-tagged encoding.
//! - [`render`]: the end-to-end pipeline and its JSON report.

pub use voussoir_core as core;
pub use voussoir_glyph as glyph;
pub use voussoir_page as page;

pub mod convert;
pub mod encode;
pub mod render;

pub use convert::{image_from_dynamic, image_to_dynamic, load_image};
pub use encode::{write_image, EncodeError, OutputFormat, SUPPORTED_EXTENSIONS};
pub use render::{
    PageRenderer, RenderError, RenderRequest, RunReport, SideError, SideEstimate, SideOutcome,
    SideRequest,
};
pub use voussoir_glyph::{DetectorParams, Glyph, MarkerDetection, PageSide};
pub use voussoir_page::{EdgeOffsets, PageSpec};
