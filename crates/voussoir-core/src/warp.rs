//! Inverse-mapping perspective warp with area-aware supersampling.

use crate::quad::edge_lengths;
use crate::{sample_bilinear, Homography, Image, ImageView};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Upper bound on samples per output pixel along each axis.
pub const MAX_SUPERSAMPLE: usize = 4;

/// Samples per axis needed so that each output pixel averages roughly one
/// source pixel per sample when the source quad is denser than the target.
///
/// `src` and `dst` are corresponding quads (same corner order).
pub fn supersample_factor(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> usize {
    let s = edge_lengths(src);
    let d = edge_lengths(dst);
    let ratio = s
        .iter()
        .zip(d.iter())
        .filter(|(_, d)| **d > 0.0)
        .map(|(s, d)| s / d)
        .fold(1.0f32, f32::max);
    if !ratio.is_finite() {
        return MAX_SUPERSAMPLE;
    }
    (ratio.ceil() as usize).clamp(1, MAX_SUPERSAMPLE)
}

/// Warp into a `out_w × out_h` image: every destination pixel is mapped to the
/// source with `h_src_from_dst` and sampled bilinearly.
///
/// With `supersample = s > 1`, each destination pixel averages an `s × s`
/// grid of samples spread over its area. Samples that fall outside the
/// source read as black.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, h_src_from_dst), fields(channels = src.channels))
)]
pub fn warp_perspective(
    src: &ImageView<'_>,
    h_src_from_dst: &Homography,
    out_w: usize,
    out_h: usize,
    supersample: usize,
) -> Image {
    let s = supersample.clamp(1, MAX_SUPERSAMPLE);
    let channels = src.channels;
    let mut out = Image::new(out_w, out_h, channels);

    let step = 1.0 / s as f32;
    let norm = 1.0 / (s * s) as f32;
    let mut acc = vec![0.0f32; channels];

    for y in 0..out_h {
        for x in 0..out_w {
            acc.iter_mut().for_each(|a| *a = 0.0);
            for sy in 0..s {
                for sx in 0..s {
                    let pd = Point2::new(
                        x as f32 + (sx as f32 + 0.5) * step,
                        y as f32 + (sy as f32 + 0.5) * step,
                    );
                    let ps = h_src_from_dst.apply(pd);
                    for (c, a) in acc.iter_mut().enumerate() {
                        *a += sample_bilinear(src, ps.x, ps.y, c);
                    }
                }
            }
            for (v, a) in out.pixel_mut(x, y).iter_mut().zip(acc.iter()) {
                *v = (a * norm).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}
