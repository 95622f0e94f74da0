//! Interleaved 8-bit image buffers.
//!
//! Continuous coordinates follow the pixel-area convention: pixel `(i, j)`
//! covers `[i, i + 1) × [j, j + 1)` and its centre sits at `(i + 0.5, j + 0.5)`.

/// Borrowed row-major image with `channels` interleaved samples per pixel.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: &'a [u8], // len = width * height * channels
}

/// Owned counterpart of [`ImageView`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl<'a> ImageView<'a> {
    /// Wrap a raw buffer, checking that its length matches the dimensions.
    pub fn new(width: usize, height: usize, channels: usize, data: &'a [u8]) -> Option<Self> {
        if !(1..=4).contains(&channels) {
            return None;
        }
        let expected = width.checked_mul(height)?.checked_mul(channels)?;
        (data.len() == expected).then_some(Self {
            width,
            height,
            channels,
            data,
        })
    }

    #[inline]
    pub fn is_gray(&self) -> bool {
        self.channels == 1
    }

    /// Luma conversion (ITU-R BT.601 weights). Alpha is ignored.
    pub fn to_gray(&self) -> Image {
        if self.is_gray() {
            return Image {
                width: self.width,
                height: self.height,
                channels: 1,
                data: self.data.to_vec(),
            };
        }

        let data = self
            .data
            .chunks_exact(self.channels)
            .map(|px| {
                if px.len() < 3 {
                    px[0]
                } else {
                    let l = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
                    ((l + 500) / 1000) as u8
                }
            })
            .collect();

        Image {
            width: self.width,
            height: self.height,
            channels: 1,
            data,
        }
    }
}

impl Image {
    /// Black image of the given size.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0u8; width * height * channels],
        }
    }

    #[inline]
    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [u8] {
        let start = (y * self.width + x) * self.channels;
        &mut self.data[start..start + self.channels]
    }
}

#[inline]
fn get_sample(src: &ImageView<'_>, x: i32, y: i32, c: usize) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[(y as usize * src.width + x as usize) * src.channels + c]
}

/// Bilinear sample of channel `c` at continuous position `(x, y)`.
///
/// Taps outside the image read as black.
#[inline]
pub fn sample_bilinear(src: &ImageView<'_>, x: f32, y: f32, c: usize) -> f32 {
    if !x.is_finite() || !y.is_finite() {
        return 0.0;
    }
    let xf = x - 0.5;
    let yf = y - 0.5;
    let x0 = xf.floor() as i32;
    let y0 = yf.floor() as i32;
    let fx = xf - x0 as f32;
    let fy = yf - y0 as f32;

    let p00 = get_sample(src, x0, y0, c) as f32;
    let p10 = get_sample(src, x0 + 1, y0, c) as f32;
    let p01 = get_sample(src, x0, y0 + 1, c) as f32;
    let p11 = get_sample(src, x0 + 1, y0 + 1, c) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &ImageView<'_>, x: f32, y: f32, c: usize) -> u8 {
    sample_bilinear(src, x, y, c).round().clamp(0.0, 255.0) as u8
}
