//! Output validation and encoding with resolution metadata.

use crate::convert::image_to_dynamic;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};
use log::debug;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use voussoir_core::Image;

/// File extensions accepted for input and output images (case-insensitive).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "bmp", "jpg", "jpeg", "jpe", "png", "webp", "pbm", "pgm", "ppm", "tif", "tiff",
];

const JPEG_QUALITY: u8 = 95;
const METERS_PER_INCH: f64 = 0.0254;
/// Gray levels at or above this are written as white in PBM output.
const BILEVEL_THRESHOLD: u8 = 128;

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error(
        "unsupported image extension {extension:?} for {}; use one of: {}",
        .path.display(),
        SUPPORTED_EXTENSIONS.join(", ")
    )]
    UnsupportedExtension { path: PathBuf, extension: String },
    #[error("output file {} already exists", .0.display())]
    OutputExists(PathBuf),
    #[error("input file {} does not exist", .0.display())]
    InputMissing(PathBuf),
    #[error("cannot encode a {0}-channel image")]
    UnsupportedChannels(usize),
    #[error("image of {width}x{height} px is too large to encode")]
    TooLarge { width: usize, height: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Png(#[from] png::EncodingError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Container chosen from the output file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    WebP,
    Pbm,
    Pgm,
    Ppm,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, EncodeError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let format = match extension.as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" | "jpe" => Self::Jpeg,
            "tif" | "tiff" => Self::Tiff,
            "bmp" => Self::Bmp,
            "webp" => Self::WebP,
            "pbm" => Self::Pbm,
            "pgm" => Self::Pgm,
            "ppm" => Self::Ppm,
            _ => {
                return Err(EncodeError::UnsupportedExtension {
                    path: path.to_path_buf(),
                    extension,
                })
            }
        };
        Ok(format)
    }

    /// Whether the written file records the output resolution.
    pub fn carries_dpi(self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }
}

/// An input image must exist and have a supported extension.
pub fn check_input_path(path: &Path) -> Result<(), EncodeError> {
    if !path.exists() {
        return Err(EncodeError::InputMissing(path.to_path_buf()));
    }
    OutputFormat::from_path(path).map(|_| ())
}

/// An output image needs a supported extension and must not exist yet
/// unless `overwrite` is set.
pub fn check_output_path(path: &Path, overwrite: bool) -> Result<OutputFormat, EncodeError> {
    let format = OutputFormat::from_path(path)?;
    if !overwrite && path.exists() {
        return Err(EncodeError::OutputExists(path.to_path_buf()));
    }
    Ok(format)
}

/// Encode `img` to `path`, recording `dpi` where the format allows it.
pub fn write_image(path: &Path, img: &Image, dpi: f64, overwrite: bool) -> Result<(), EncodeError> {
    let format = check_output_path(path, overwrite)?;
    let width = u32::try_from(img.width).map_err(|_| too_large(img))?;
    let height = u32::try_from(img.height).map_err(|_| too_large(img))?;

    if !format.carries_dpi() {
        debug!("{format:?} output does not record resolution; {dpi} dpi not written");
    }

    match format {
        OutputFormat::Png => write_png(path, img, width, height, dpi),
        OutputFormat::Jpeg => {
            let (data, color) = rgb_or_gray(img)?;
            let mut encoder =
                JpegEncoder::new_with_quality(BufWriter::new(File::create(path)?), JPEG_QUALITY);
            let density = dpi.round().clamp(1.0, u16::MAX as f64) as u16;
            encoder.set_pixel_density(PixelDensity::dpi(density));
            encoder.encode(&data, width, height, color)?;
            Ok(())
        }
        OutputFormat::Tiff => {
            let (data, color) = rgb_or_gray(img)?;
            TiffEncoder::new(BufWriter::new(File::create(path)?))
                .write_image(&data, width, height, color)?;
            Ok(())
        }
        OutputFormat::Bmp => {
            let (data, color) = rgb_or_gray(img)?;
            let mut out = BufWriter::new(File::create(path)?);
            BmpEncoder::new(&mut out).write_image(&data, width, height, color)?;
            Ok(())
        }
        OutputFormat::WebP => {
            let (data, color) = rgb_or_gray(img)?;
            WebPEncoder::new_lossless(BufWriter::new(File::create(path)?))
                .write_image(&data, width, height, color)?;
            Ok(())
        }
        OutputFormat::Pbm | OutputFormat::Pgm | OutputFormat::Ppm => {
            let (subtype, data, color) = match format {
                OutputFormat::Ppm => (
                    PnmSubtype::Pixmap(SampleEncoding::Binary),
                    to_rgb(img)?,
                    ExtendedColorType::Rgb8,
                ),
                OutputFormat::Pbm => (
                    PnmSubtype::Bitmap(SampleEncoding::Binary),
                    to_bilevel(img)?,
                    ExtendedColorType::L8,
                ),
                _ => (
                    PnmSubtype::Graymap(SampleEncoding::Binary),
                    to_gray(img)?,
                    ExtendedColorType::L8,
                ),
            };
            PnmEncoder::new(BufWriter::new(File::create(path)?))
                .with_subtype(subtype)
                .write_image(&data, width, height, color)?;
            Ok(())
        }
    }
}

fn too_large(img: &Image) -> EncodeError {
    EncodeError::TooLarge {
        width: img.width,
        height: img.height,
    }
}

fn write_png(path: &Path, img: &Image, width: u32, height: u32, dpi: f64) -> Result<(), EncodeError> {
    let color = match img.channels {
        1 => png::ColorType::Grayscale,
        2 => png::ColorType::GrayscaleAlpha,
        3 => png::ColorType::Rgb,
        4 => png::ColorType::Rgba,
        c => return Err(EncodeError::UnsupportedChannels(c)),
    };
    let mut encoder = png::Encoder::new(BufWriter::new(File::create(path)?), width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    let ppm = (dpi / METERS_PER_INCH).round() as u32;
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: png::Unit::Meter,
    }));
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&img.data)?;
    writer.finish()?;
    Ok(())
}

fn rgb_or_gray(img: &Image) -> Result<(Vec<u8>, ExtendedColorType), EncodeError> {
    match img.channels {
        1 => Ok((img.data.clone(), ExtendedColorType::L8)),
        3 => Ok((img.data.clone(), ExtendedColorType::Rgb8)),
        _ => Ok((to_rgb(img)?, ExtendedColorType::Rgb8)),
    }
}

fn to_rgb(img: &Image) -> Result<Vec<u8>, EncodeError> {
    if img.channels == 3 {
        return Ok(img.data.clone());
    }
    if img.channels == 1 {
        return Ok(img.data.iter().flat_map(|&v| [v, v, v]).collect());
    }
    let dynamic = image_to_dynamic(img).ok_or(EncodeError::UnsupportedChannels(img.channels))?;
    Ok(dynamic.to_rgb8().into_raw())
}

fn to_gray(img: &Image) -> Result<Vec<u8>, EncodeError> {
    match img.channels {
        1 => Ok(img.data.clone()),
        3 | 4 => Ok(img.view().to_gray().data),
        c => Err(EncodeError::UnsupportedChannels(c)),
    }
}

/// PBM samples for the `image` encoder: 0 is black, 1 is white.
fn to_bilevel(img: &Image) -> Result<Vec<u8>, EncodeError> {
    Ok(to_gray(img)?
        .into_iter()
        .map(|v| u8::from(v >= BILEVEL_THRESHOLD))
        .collect())
}
