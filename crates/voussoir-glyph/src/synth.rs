//! Synthetic glyph rendering for tests and benchmarks.

use crate::codebook::{Glyph, GRID_CELLS};
use crate::decode::glyph_to_image;
use nalgebra::Point2;
use voussoir_core::Image;

/// Paint `glyph` into `img` so that its outer corners (canonical TL, TR, BR,
/// BL) land on `corners`.
///
/// Ink is `ink`, data cells left blank are `paper`; pixels outside the glyph
/// keep their value. Edge pixels are anti-aliased with `aa × aa` samples.
/// Returns `None` when the corners are degenerate.
pub fn paint_glyph(
    img: &mut Image,
    glyph: Glyph,
    corners: &[Point2<f32>; 4],
    ink: u8,
    paper: u8,
    aa: usize,
) -> Option<()> {
    let h_glyph_from_img = glyph_to_image(corners)?.inverse()?;
    let pattern = glyph.bit_pattern();
    let aa = aa.max(1);
    let cells = GRID_CELLS as f32;

    let (mut x0, mut y0) = (f32::INFINITY, f32::INFINITY);
    let (mut x1, mut y1) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in corners {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    let xs = (x0.floor().max(0.0) as usize)..(x1.ceil().max(0.0) as usize).min(img.width);
    let ys = (y0.floor().max(0.0) as usize)..(y1.ceil().max(0.0) as usize).min(img.height);

    for y in ys {
        for x in xs.clone() {
            let mut acc = 0.0f32;
            let mut inside = 0usize;
            let px = img.pixel(x, y)[0] as f32;
            for sy in 0..aa {
                for sx in 0..aa {
                    let p = Point2::new(
                        x as f32 + (sx as f32 + 0.5) / aa as f32,
                        y as f32 + (sy as f32 + 0.5) / aa as f32,
                    );
                    let g = h_glyph_from_img.apply(p);
                    if g.x >= 0.0 && g.y >= 0.0 && g.x < cells && g.y < cells {
                        inside += 1;
                        let black = pattern.get(g.x as usize, g.y as usize);
                        acc += if black { ink as f32 } else { paper as f32 };
                    } else {
                        acc += px;
                    }
                }
            }
            if inside > 0 {
                let v = (acc / (aa * aa) as f32).round() as u8;
                img.pixel_mut(x, y).iter_mut().for_each(|c| *c = v);
            }
        }
    }
    Some(())
}

/// Image filled with a constant value.
pub fn blank(width: usize, height: usize, channels: usize, value: u8) -> Image {
    let mut img = Image::new(width, height, channels);
    img.data.fill(value);
    img
}

/// Axis-aligned square with top-left `(x, y)` and side `s`, clockwise.
pub fn square(x: f32, y: f32, s: f32) -> [Point2<f32>; 4] {
    [
        Point2::new(x, y),
        Point2::new(x + s, y),
        Point2::new(x + s, y + s),
        Point2::new(x, y + s),
    ]
}

/// A flat book spread in physical units with a glyph at each page corner,
/// rendered through a camera homography.
#[derive(Clone, Debug)]
pub struct SpreadScene {
    /// Page width between the glyphs' inner vertical edges.
    pub page_width: f32,
    /// Page height between the glyphs' outer horizontal edges.
    pub page_height: f32,
    /// Gap between the two pages. Must exceed twice the glyph size.
    pub gutter: f32,
    /// Offset of the left page's top-left corner from the scene origin.
    pub margin: f32,
    pub glyph_size: f32,
    /// Dark rectangles `[x0, y0, x1, y1]` in scene units.
    pub dark_boxes: Vec<[f32; 4]>,
    /// Glyphs left out of the rendering.
    pub omit: Vec<Glyph>,
    /// Additional glyph copies at arbitrary scene positions.
    pub extra: Vec<(Glyph, Point2<f32>)>,
    pub ink: u8,
    pub paper: u8,
}

impl Default for SpreadScene {
    fn default() -> Self {
        Self {
            page_width: 6.0,
            page_height: 9.5,
            gutter: 1.5,
            margin: 0.5,
            glyph_size: 0.5,
            dark_boxes: Vec::new(),
            omit: Vec::new(),
            extra: Vec::new(),
            ink: 20,
            paper: 235,
        }
    }
}

impl SpreadScene {
    /// Scene position of a page's top-left corner.
    pub fn page_origin(&self, side: crate::PageSide) -> Point2<f32> {
        let x0 = match side {
            crate::PageSide::Left => self.margin,
            crate::PageSide::Right => self.margin + self.page_width + self.gutter,
        };
        Point2::new(x0, self.margin)
    }

    /// Scene position of a glyph centre. Glyphs sit outside the page
    /// horizontally and inside it vertically, touching its corner.
    pub fn glyph_centre(&self, glyph: Glyph) -> Point2<f32> {
        use crate::Corner;
        let o = self.page_origin(glyph.side());
        let s = 0.5 * self.glyph_size;
        let (dx, dy) = match glyph.corner() {
            Corner::TopLeft => (-s, s),
            Corner::TopRight => (self.page_width + s, s),
            Corner::BottomRight => (self.page_width + s, self.page_height - s),
            Corner::BottomLeft => (-s, self.page_height - s),
        };
        Point2::new(o.x + dx, o.y + dy)
    }

    /// Overall scene extent.
    pub fn size(&self) -> (f32, f32) {
        (
            2.0 * (self.margin + self.page_width) + self.gutter,
            2.0 * self.margin + self.page_height,
        )
    }

    fn placements(&self) -> Vec<(Glyph, Point2<f32>)> {
        Glyph::ALL
            .iter()
            .filter(|g| !self.omit.contains(g))
            .map(|&g| (g, self.glyph_centre(g)))
            .chain(self.extra.iter().copied())
            .collect()
    }

    fn shade(&self, placements: &[(Glyph, Point2<f32>)], p: Point2<f32>) -> u8 {
        let half = 0.5 * self.glyph_size;
        let cells = GRID_CELLS as f32;
        for (g, c) in placements {
            let u = (p.x - (c.x - half)) / self.glyph_size * cells;
            let v = (p.y - (c.y - half)) / self.glyph_size * cells;
            if u >= 0.0 && v >= 0.0 && u < cells && v < cells {
                let black = g.bit_pattern().get(u as usize, v as usize);
                return if black { self.ink } else { self.paper };
            }
        }
        for b in &self.dark_boxes {
            if p.x >= b[0] && p.x < b[2] && p.y >= b[1] && p.y < b[3] {
                return self.ink.saturating_add(30);
            }
        }
        self.paper
    }

    /// Render with `cam` mapping scene units to image pixels, using 2×2
    /// samples per pixel.
    pub fn render(
        &self,
        cam: &voussoir_core::Homography,
        width: usize,
        height: usize,
        channels: usize,
    ) -> Option<Image> {
        let inv = cam.inverse()?;
        let placements = self.placements();
        let mut img = Image::new(width, height, channels);
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0u32;
                for (sx, sy) in [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)] {
                    let p = inv.apply(Point2::new(x as f32 + sx, y as f32 + sy));
                    acc += self.shade(&placements, p) as u32;
                }
                let v = ((acc + 2) / 4) as u8;
                img.pixel_mut(x, y).iter_mut().for_each(|c| *c = v);
            }
        }
        Some(img)
    }
}
