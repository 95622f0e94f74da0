//! Perspective rectification of one page.

use crate::{assemble_side, EdgeOffsets, PageError, PageLayout, PageSpec};
use log::debug;
use nalgebra::Point2;
use voussoir_core::{
    check_quad, homography_from_4pt, supersample_factor, warp_perspective, GeometryFailure,
    Homography, Image, ImageView,
};
use voussoir_glyph::{MarkerDetection, PageSide};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Homography taking image points onto the page raster, given where the four
/// corner points must land.
pub fn page_homography(
    corners: &[Point2<f32>; 4],
    anchors: &[Point2<f32>; 4],
) -> Result<Homography, GeometryFailure> {
    check_quad(corners)?;
    check_quad(anchors)?;
    homography_from_4pt(corners, anchors).ok_or(GeometryFailure::SingularHomography)
}

/// Map `corners` (TL, TR, BR, BL) onto a `width_px × height_px` rectangle.
pub fn rectify(
    image: &ImageView<'_>,
    corners: &[Point2<f32>; 4],
    width_px: usize,
    height_px: usize,
) -> Result<Image, GeometryFailure> {
    let (w, h) = (width_px as f32, height_px as f32);
    let anchors = [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(w, h),
        Point2::new(0.0, h),
    ];
    rectify_to(image, corners, &anchors, width_px, height_px)
}

/// Rectify using a layout whose anchors may sit outside the output raster.
pub fn rectify_layout(
    image: &ImageView<'_>,
    corners: &[Point2<f32>; 4],
    layout: &PageLayout,
) -> Result<Image, GeometryFailure> {
    rectify_to(image, corners, &layout.anchors, layout.width_px, layout.height_px)
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(image, corners, anchors))
)]
fn rectify_to(
    image: &ImageView<'_>,
    corners: &[Point2<f32>; 4],
    anchors: &[Point2<f32>; 4],
    width_px: usize,
    height_px: usize,
) -> Result<Image, GeometryFailure> {
    let h_page_from_img = page_homography(corners, anchors)?;
    let h_img_from_page = h_page_from_img
        .inverse()
        .ok_or(GeometryFailure::SingularHomography)?;
    let s = supersample_factor(corners, anchors);
    debug!("rectifying to {width_px}x{height_px} px, {s}x{s} samples per pixel");
    Ok(warp_perspective(image, &h_img_from_page, width_px, height_px, s))
}

/// A rectified page and the layout it was rendered with.
#[derive(Clone, Debug)]
pub struct RectifiedPage {
    pub side: PageSide,
    pub layout: PageLayout,
    pub image: Image,
}

/// Assemble, lay out and rectify one side of the spread.
pub fn rectify_side(
    image: &ImageView<'_>,
    detections: &[MarkerDetection],
    side: PageSide,
    spec: &PageSpec,
    offsets: &EdgeOffsets,
) -> Result<RectifiedPage, PageError> {
    let corners = assemble_side(detections, side)?;
    let layout = PageLayout::new(spec, offsets)?;
    let page = rectify_layout(image, &corners.points, &layout)?;
    Ok(RectifiedPage {
        side,
        layout,
        image: page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voussoir_core::Homography;

    fn gradient(w: usize, h: usize) -> Image {
        let mut img = Image::new(w, h, 1);
        for y in 0..h {
            for x in 0..w {
                img.data[y * w + x] = (x + y) as u8;
            }
        }
        img
    }

    #[test]
    fn rectify_inverts_a_known_projective_warp() {
        let (pw, ph) = (120usize, 90usize);
        let page = gradient(pw, ph);

        // Photo of the page: page -> photo is `h`.
        let h = Homography::from_array([
            [1.3, 0.15, 40.0],
            [-0.05, 1.2, 30.0],
            [0.0008, 0.0012, 1.0],
        ]);
        let h_page_from_photo = h.inverse().unwrap();
        let photo = warp_perspective(&page.view(), &h_page_from_photo, 260, 220, 2);

        let rect = [
            Point2::new(0.0, 0.0),
            Point2::new(pw as f32, 0.0),
            Point2::new(pw as f32, ph as f32),
            Point2::new(0.0, ph as f32),
        ];
        let corners = rect.map(|p| h.apply(p));
        let out = rectify(&photo.view(), &corners, pw, ph).unwrap();
        assert_eq!((out.width, out.height), (pw, ph));

        let mut total = 0.0f64;
        let mut n = 0usize;
        for y in 4..ph - 4 {
            for x in 4..pw - 4 {
                let a = out.data[y * pw + x] as f64;
                let b = page.data[y * pw + x] as f64;
                total += (a - b).abs();
                n += 1;
            }
        }
        assert!(total / (n as f64) < 1.5, "mean abs error {}", total / n as f64);
    }

    #[test]
    fn degenerate_corners_fail() {
        let img = gradient(10, 10);
        let corners = [
            Point2::new(1.0, 1.0),
            Point2::new(5.0, 5.0),
            Point2::new(9.0, 9.0),
            Point2::new(1.0, 9.0),
        ];
        assert!(matches!(
            rectify(&img.view(), &corners, 8, 8),
            Err(GeometryFailure::CollinearCorners { .. })
        ));
    }

    #[test]
    fn identity_layout_copies_the_quad() {
        let img = gradient(40, 30);
        let corners = [
            Point2::new(10.0, 5.0),
            Point2::new(30.0, 5.0),
            Point2::new(30.0, 25.0),
            Point2::new(10.0, 25.0),
        ];
        let out = rectify(&img.view(), &corners, 20, 20).unwrap();
        for y in 0..20 {
            for x in 0..20 {
                assert_eq!(out.data[y * 20 + x], img.data[(y + 5) * 40 + x + 10]);
            }
        }
    }
}
