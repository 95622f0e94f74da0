//! Adapters between `image` crate buffers and [`voussoir_core::Image`].

use image::{DynamicImage, GrayImage, RgbImage};
use std::path::Path;
use voussoir_core::Image;

/// Convert a decoded image into an owned core buffer.
///
/// Gray inputs (with or without alpha) stay single-channel; everything else
/// becomes 8-bit RGB. Alpha is dropped.
pub fn image_from_dynamic(img: &DynamicImage) -> Image {
    match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => {
            let gray = img.to_luma8();
            Image {
                width: gray.width() as usize,
                height: gray.height() as usize,
                channels: 1,
                data: gray.into_raw(),
            }
        }
        _ => {
            let rgb = img.to_rgb8();
            Image {
                width: rgb.width() as usize,
                height: rgb.height() as usize,
                channels: 3,
                data: rgb.into_raw(),
            }
        }
    }
}

/// Convert a core buffer back into a `DynamicImage`. Returns `None` for
/// channel counts other than 1 and 3 or a mismatched buffer.
pub fn image_to_dynamic(img: &Image) -> Option<DynamicImage> {
    let (w, h) = (u32::try_from(img.width).ok()?, u32::try_from(img.height).ok()?);
    match img.channels {
        1 => GrayImage::from_raw(w, h, img.data.clone()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(w, h, img.data.clone()).map(DynamicImage::ImageRgb8),
        _ => None,
    }
}

/// Decode an image file into a core buffer.
pub fn load_image(path: impl AsRef<Path>) -> Result<Image, image::ImageError> {
    let img = image::open(path)?;
    Ok(image_from_dynamic(&img))
}
