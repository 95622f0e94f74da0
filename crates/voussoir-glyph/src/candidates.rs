//! Quadrilateral candidate search.
//!
//! Pipeline: local-mean inverse threshold, border following, closed
//! Douglas–Peucker approximation, geometric filters, then sub-pixel corner
//! refinement from the contour edges. Nothing here knows about glyph codes.

use crate::threshold::adaptive_threshold_inv;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use log::{debug, trace};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use voussoir_core::quad::{edge_lengths, is_convex, line_intersection, order_clockwise, signed_area};
use voussoir_core::Image;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Knobs for candidate search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateParams {
    /// Half-size of the local-mean threshold window, in pixels.
    pub block_radius: usize,
    /// Pixels must be this much darker than the local mean to be ink.
    pub threshold_offset: f64,
    /// Quad area bounds as fractions of the image area.
    pub min_area_frac: f64,
    pub max_area_frac: f64,
    /// Largest allowed bounding-box aspect ratio.
    pub max_aspect: f32,
    /// Shortest allowed quad side, in pixels.
    pub min_side_px: f32,
    /// Polygon approximation tolerance relative to the contour perimeter.
    pub poly_epsilon_frac: f32,
    /// Refine corners by fitting lines to the contour edges.
    pub refine_corners: bool,
}

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            block_radius: 15,
            threshold_offset: 8.0,
            min_area_frac: 0.0001,
            max_area_frac: 0.001,
            max_aspect: 2.2,
            min_side_px: 8.0,
            poly_epsilon_frac: 0.02,
            refine_corners: true,
        }
    }
}

/// A convex quad that may hold a glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Outer corners, clockwise on screen starting nearest the image's
    /// top-left, in pixel-area coordinates.
    pub corners: [Point2<f32>; 4],
    pub area: f32,
}

/// Find glyph-sized convex quads in a grayscale image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(gray, params), fields(w = gray.width, h = gray.height))
)]
pub fn find_candidates(gray: &Image, params: &CandidateParams) -> Vec<Candidate> {
    let binary = adaptive_threshold_inv(gray, params.block_radius, params.threshold_offset);
    let Some(binary) = GrayImage::from_raw(binary.width as u32, binary.height as u32, binary.data)
    else {
        return Vec::new();
    };

    let contours = find_contours::<i32>(&binary);
    let image_area = (gray.width * gray.height) as f64;
    let min_area = (params.min_area_frac * image_area) as f32;
    let max_area = (params.max_area_frac * image_area) as f32;

    let mut out = Vec::new();
    for contour in contours.iter().filter(|c| c.border_type == BorderType::Outer) {
        if contour.points.len() < 8 {
            continue;
        }
        let pts: Vec<Point2<f32>> = contour
            .points
            .iter()
            .map(|p| Point2::new(p.x as f32, p.y as f32))
            .collect();

        let (bw, bh) = bbox_size(&pts);
        if (bw + 1.0) * (bh + 1.0) < min_area {
            continue;
        }

        let epsilon = params.poly_epsilon_frac * closed_perimeter(&pts);
        let vertices = approx_closed_polygon(&pts, epsilon);
        if vertices.len() != 4 {
            continue;
        }
        let idx = [vertices[0], vertices[1], vertices[2], vertices[3]];
        let poly = idx.map(|i| pts[i]);
        if !is_convex(&poly) {
            continue;
        }

        let area = signed_area(&poly).abs();
        if area < min_area || area > max_area {
            trace!("quad area {area:.0} outside [{min_area:.0}, {max_area:.0}]");
            continue;
        }
        let (qw, qh) = bbox_size(&poly);
        let aspect = qw.max(qh) / qw.min(qh).max(1e-6);
        if aspect > params.max_aspect {
            continue;
        }
        if edge_lengths(&poly).iter().copied().fold(f32::INFINITY, f32::min) < params.min_side_px {
            continue;
        }

        let mut corners = if params.refine_corners {
            refine_corners(&pts, &idx).unwrap_or_else(|| pixel_centres(poly))
        } else {
            pixel_centres(poly)
        };
        order_clockwise(&mut corners);
        start_top_left(&mut corners);
        out.push(Candidate {
            area: signed_area(&corners),
            corners,
        });
    }

    debug!(
        "candidate search: {} contours, {} quads",
        contours.len(),
        out.len()
    );
    out
}

/// Rotate the corner order so that it starts at the vertex nearest the
/// image's top-left.
fn start_top_left(q: &mut [Point2<f32>; 4]) {
    let start = (0..4)
        .min_by(|&a, &b| (q[a].x + q[a].y).total_cmp(&(q[b].x + q[b].y)))
        .unwrap_or(0);
    q.rotate_left(start);
}

fn pixel_centres(q: [Point2<f32>; 4]) -> [Point2<f32>; 4] {
    q.map(|p| Point2::new(p.x + 0.5, p.y + 0.5))
}

fn bbox_size(pts: &[Point2<f32>]) -> (f32, f32) {
    let (mut x0, mut y0) = (f32::INFINITY, f32::INFINITY);
    let (mut x1, mut y1) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in pts {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    (x1 - x0, y1 - y0)
}

fn closed_perimeter(pts: &[Point2<f32>]) -> f32 {
    let n = pts.len();
    (0..n).map(|i| (pts[(i + 1) % n] - pts[i]).norm()).sum()
}

fn farthest_from(pts: &[Point2<f32>], from: Point2<f32>) -> usize {
    let mut best = (0, -1.0f32);
    for (i, p) in pts.iter().enumerate() {
        let d = (p - from).norm_squared();
        if d > best.1 {
            best = (i, d);
        }
    }
    best.0
}

/// Douglas–Peucker on a closed contour. Returns vertex indices in contour order.
///
/// The contour is split at two far-apart points and each half is simplified
/// as an open chain.
pub(crate) fn approx_closed_polygon(pts: &[Point2<f32>], epsilon: f32) -> Vec<usize> {
    let n = pts.len();
    if n < 3 {
        return (0..n).collect();
    }

    let a = farthest_from(pts, pts[0]);
    let b = farthest_from(pts, pts[a]);
    if a == b {
        return vec![a];
    }
    let (lo, hi) = (a.min(b), a.max(b));

    let first: Vec<usize> = (lo..=hi).collect();
    let second: Vec<usize> = (hi..n).chain(0..=lo).collect();

    let mut out = simplify_chain(pts, &first, epsilon);
    out.pop();
    let mut rest = simplify_chain(pts, &second, epsilon);
    rest.pop();
    out.extend(rest);
    out
}

fn simplify_chain(pts: &[Point2<f32>], chain: &[usize], epsilon: f32) -> Vec<usize> {
    let m = chain.len();
    if m <= 2 {
        return chain.to_vec();
    }

    let mut keep = vec![false; m];
    keep[0] = true;
    keep[m - 1] = true;
    let mut stack = vec![(0usize, m - 1)];

    while let Some((s, e)) = stack.pop() {
        if e <= s + 1 {
            continue;
        }
        let p0 = pts[chain[s]];
        let p1 = pts[chain[e]];
        let d = p1 - p0;
        let len = d.norm();

        let mut best = (s, 0.0f32);
        for k in (s + 1)..e {
            let v = pts[chain[k]] - p0;
            let dist = if len > 1e-6 {
                d.perp(&v).abs() / len
            } else {
                v.norm()
            };
            if dist > best.1 {
                best = (k, dist);
            }
        }

        if best.1 > epsilon {
            keep[best.0] = true;
            stack.push((s, best.0));
            stack.push((best.0, e));
        }
    }

    chain
        .iter()
        .zip(keep)
        .filter_map(|(&i, k)| k.then_some(i))
        .collect()
}

/// Best-fit line through points: centroid and unit direction.
fn fit_line(pts: &[Point2<f32>]) -> Option<(Point2<f32>, Vector2<f32>)> {
    if pts.len() < 2 {
        return None;
    }
    let n = pts.len() as f32;
    let cx = pts.iter().map(|p| p.x).sum::<f32>() / n;
    let cy = pts.iter().map(|p| p.y).sum::<f32>() / n;
    let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
    for p in pts {
        let dx = p.x - cx;
        let dy = p.y - cy;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx + syy < 1e-6 {
        return None;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    Some((Point2::new(cx, cy), Vector2::new(theta.cos(), theta.sin())))
}

/// Intersect lines fitted to the four contour edges.
///
/// Contour points are the centres of boundary ink pixels, so each fitted line
/// is pushed half a pixel outward onto the ink/paper transition.
fn refine_corners(pts: &[Point2<f32>], idx: &[usize; 4]) -> Option<[Point2<f32>; 4]> {
    let n = pts.len();
    let centre = idx
        .iter()
        .map(|&i| pts[i].coords)
        .sum::<Vector2<f32>>()
        / 4.0;

    let mut lines = [(Point2::origin(), Vector2::zeros()); 4];
    for e in 0..4 {
        let (i0, i1) = (idx[e], idx[(e + 1) % 4]);
        let (a, b) = (pts[i0], pts[i1]);
        let trim = (0.15 * (b - a).norm()).max(1.0);

        let span = (i1 + n - i0) % n;
        let edge: Vec<Point2<f32>> = (0..=span)
            .map(|k| pts[(i0 + k) % n])
            .filter(|p| (p - a).norm() >= trim && (p - b).norm() >= trim)
            .collect();
        let (m, d) = fit_line(&edge)?;

        let mut normal = Vector2::new(-d.y, d.x);
        if normal.dot(&(m.coords - centre)) < 0.0 {
            normal = -normal;
        }
        lines[e] = (m + Vector2::new(0.5, 0.5) + normal * 0.5, d);
    }

    let mut corners = [Point2::origin(); 4];
    for (k, corner) in corners.iter_mut().enumerate() {
        let (p_prev, d_prev) = lines[(k + 3) % 4];
        let (p_next, d_next) = lines[k];
        let c = line_intersection(p_prev, d_prev, p_next, d_next)?;
        let raw = pts[idx[k]];
        // A corner that moves far from its polygon vertex means a bad fit.
        if (c - Point2::new(raw.x + 0.5, raw.y + 0.5)).norm() > 3.0 {
            return None;
        }
        *corner = c;
    }
    Some(corners)
}
