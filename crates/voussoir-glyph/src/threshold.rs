//! Thresholding used by candidate search and glyph decoding.

use voussoir_core::Image;

/// Compute Otsu threshold from a set of sample intensities.
///
/// Samples strictly below the returned value are the dark class.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v as u16 + max_v as u16).div_ceil(2)) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    // Class split is `<= best_t` vs `> best_t`; callers test `< threshold`.
    best_t.saturating_add(1)
}

/// Summed-area table with a zero row and column in front.
struct IntegralImage {
    stride: usize,
    table: Vec<u64>,
}

impl IntegralImage {
    fn new(gray: &Image) -> Self {
        let (w, h) = (gray.width, gray.height);
        let stride = w + 1;
        let mut table = vec![0u64; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0u64;
            for x in 0..w {
                row_sum += gray.data[y * w + x] as u64;
                table[(y + 1) * stride + x + 1] = row_sum + table[y * stride + x + 1];
            }
        }
        Self { stride, table }
    }

    /// Sum over `[x1, x2) × [y1, y2)`.
    #[inline]
    fn sum(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> u64 {
        let s = self.stride;
        self.table[y2 * s + x2] + self.table[y1 * s + x1]
            - self.table[y1 * s + x2]
            - self.table[y2 * s + x1]
    }
}

/// Inverse binary threshold against the local mean.
///
/// Output pixels are 255 where `gray <= mean(window) - c` and 0 elsewhere, so
/// dark glyph ink becomes foreground. The window is the `(2r+1)²` box around
/// each pixel, clipped to the image.
pub fn adaptive_threshold_inv(gray: &Image, block_radius: usize, c: f64) -> Image {
    debug_assert_eq!(gray.channels, 1);
    let (w, h) = (gray.width, gray.height);
    let integral = IntegralImage::new(gray);
    let mut out = Image::new(w, h, 1);

    for y in 0..h {
        let y1 = y.saturating_sub(block_radius);
        let y2 = (y + block_radius + 1).min(h);
        for x in 0..w {
            let x1 = x.saturating_sub(block_radius);
            let x2 = (x + block_radius + 1).min(w);
            let area = ((x2 - x1) * (y2 - y1)) as f64;
            let mean = integral.sum(x1, y1, x2, y2) as f64 / area;
            let v = gray.data[y * w + x] as f64;
            if v <= mean - c {
                out.data[y * w + x] = 255;
            }
        }
    }

    out
}
