//! Core geometry and image utilities for book-spread de-keystoning.
//!
//! This crate is small and purely numeric. It does *not* depend on any
//! concrete image codec: pixel data is passed around as [`ImageView`] /
//! [`Image`] buffers and converted at the edges by the `voussoir` facade.

mod homography;
mod image;
mod logger;
pub mod quad;
mod warp;

pub use homography::{homography_from_4pt, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, Image, ImageView};
pub use quad::{check_quad, GeometryFailure};
pub use warp::{supersample_factor, warp_perspective, MAX_SUPERSAMPLE};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_flags};
