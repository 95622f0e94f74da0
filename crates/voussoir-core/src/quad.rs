//! Quadrilateral helpers shared by glyph detection and page rectification.
//!
//! Corners are stored clockwise as seen on screen (image y axis pointing
//! down): top-left, top-right, bottom-right, bottom-left. In that frame a
//! clockwise polygon has a positive shoelace area.

use nalgebra::{Point2, Vector2};

/// A corner set that cannot define a projective map.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryFailure {
    #[error("corner {index} is not a finite point")]
    NonFiniteCorner { index: usize },
    #[error("corners {a} and {b} coincide")]
    DuplicateCorners { a: usize, b: usize },
    #[error("corners {a}, {b} and {c} are collinear")]
    CollinearCorners { a: usize, b: usize, c: usize },
    #[error("no homography maps the corner quadrilateral onto the target rectangle")]
    SingularHomography,
}

/// Corners closer than this (in pixels) are treated as the same point.
pub const MIN_CORNER_SEPARATION: f32 = 1e-3;

/// Relative area threshold under which three corners count as collinear.
const COLLINEAR_REL_EPS: f64 = 1e-6;

const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];

/// Reject quads that cannot be mapped by a non-degenerate homography.
pub fn check_quad(q: &[Point2<f32>; 4]) -> Result<(), GeometryFailure> {
    if let Some(index) = q.iter().position(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(GeometryFailure::NonFiniteCorner { index });
    }

    for a in 0..4 {
        for b in (a + 1)..4 {
            if (q[a] - q[b]).norm() < MIN_CORNER_SEPARATION {
                return Err(GeometryFailure::DuplicateCorners { a, b });
            }
        }
    }

    for (a, b, c) in TRIPLES {
        let ab = to_f64(q[b] - q[a]);
        let ac = to_f64(q[c] - q[a]);
        let bc = to_f64(q[c] - q[b]);
        let cross = ab.perp(&ac);
        let scale = ab.norm_squared().max(ac.norm_squared()).max(bc.norm_squared());
        if cross.abs() <= COLLINEAR_REL_EPS * scale {
            return Err(GeometryFailure::CollinearCorners { a, b, c });
        }
    }

    Ok(())
}

#[inline]
fn to_f64(v: Vector2<f32>) -> Vector2<f64> {
    Vector2::new(v.x as f64, v.y as f64)
}

/// Shoelace area; positive for on-screen clockwise polygons.
pub fn signed_area(poly: &[Point2<f32>]) -> f32 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for i in 0..n {
        let p = poly[i];
        let q = poly[(i + 1) % n];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (0.5 * acc) as f32
}

/// Strict convexity: every turn has the same, non-zero orientation.
pub fn is_convex(poly: &[Point2<f32>]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f32;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let c = poly[(i + 2) % n];
        let cross = (b - a).perp(&(c - b));
        if cross == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Reorder a quad in place so that it runs clockwise on screen.
pub fn order_clockwise(q: &mut [Point2<f32>; 4]) {
    if signed_area(q) < 0.0 {
        q.swap(1, 3);
    }
}

/// Intersection of the lines `p1 + t * d1` and `p2 + s * d2`.
pub fn line_intersection(
    p1: Point2<f32>,
    d1: Vector2<f32>,
    p2: Point2<f32>,
    d2: Vector2<f32>,
) -> Option<Point2<f32>> {
    let denom = d1.perp(&d2);
    if denom.abs() < 1e-9 {
        return None;
    }
    let t = (p2 - p1).perp(&d2) / denom;
    Some(p1 + d1 * t)
}

/// Intersection of the diagonals, which is the image of the centre of the
/// original square under any projective map.
pub fn diagonal_intersection(q: &[Point2<f32>; 4]) -> Option<Point2<f32>> {
    line_intersection(q[0], q[2] - q[0], q[1], q[3] - q[1])
}

/// Point-in-quad test for a convex, clockwise quad (boundary counts as inside).
pub fn contains_point(q: &[Point2<f32>; 4], p: Point2<f32>) -> bool {
    (0..4).all(|i| {
        let a = q[i];
        let b = q[(i + 1) % 4];
        (b - a).perp(&(p - a)) >= 0.0
    })
}

/// Side lengths `[TL→TR, TR→BR, BR→BL, BL→TL]`.
pub fn edge_lengths(q: &[Point2<f32>; 4]) -> [f32; 4] {
    [0, 1, 2, 3].map(|i| (q[(i + 1) % 4] - q[i]).norm())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(s: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ]
    }

    #[test]
    fn accepts_general_quad() {
        let q = [
            Point2::new(12.0, 8.0),
            Point2::new(410.0, 30.0),
            Point2::new(380.0, 520.0),
            Point2::new(25.0, 470.0),
        ];
        assert_eq!(check_quad(&q), Ok(()));
    }

    #[test]
    fn rejects_duplicates_and_collinear_corners() {
        let mut q = square(10.0);
        q[2] = q[1];
        assert_eq!(
            check_quad(&q),
            Err(GeometryFailure::DuplicateCorners { a: 1, b: 2 })
        );

        let q = [
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 5.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        assert_eq!(
            check_quad(&q),
            Err(GeometryFailure::CollinearCorners { a: 0, b: 1, c: 2 })
        );

        let mut q = square(10.0);
        q[3].x = f32::NAN;
        assert_eq!(
            check_quad(&q),
            Err(GeometryFailure::NonFiniteCorner { index: 3 })
        );
    }

    #[test]
    fn clockwise_ordering_and_area() {
        let mut q = square(4.0);
        assert_eq!(signed_area(&q), 16.0);
        q.swap(1, 3);
        assert!(signed_area(&q) < 0.0);
        order_clockwise(&mut q);
        assert_eq!(q, square(4.0));
    }

    #[test]
    fn convexity_and_containment() {
        let q = square(10.0);
        assert!(is_convex(&q));
        assert!(contains_point(&q, Point2::new(5.0, 5.0)));
        assert!(!contains_point(&q, Point2::new(11.0, 5.0)));

        let dart = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(3.0, 3.0),
            Point2::new(0.0, 10.0),
        ];
        assert!(!is_convex(&dart));
    }

    #[test]
    fn diagonals_meet_at_projective_centre() {
        let q = [
            Point2::new(0.0, 0.0),
            Point2::new(8.0, 0.0),
            Point2::new(6.0, 4.0),
            Point2::new(2.0, 4.0),
        ];
        let c = diagonal_intersection(&q).unwrap();
        assert!((c.x - 4.0).abs() < 1e-5);
        assert!((c.y - 8.0 / 3.0).abs() < 1e-5);
    }
}
