//! Grouping glyph detections into per-page corner quadruples.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use voussoir_glyph::{Corner, Glyph, MarkerDetection, PageSide};

/// Page corners framed by the four glyphs of one side, indexed by [`Corner`].
///
/// Each page corner is the glyph corner where the glyph's edge facing the
/// page interior (horizontally) meets its edge facing away from it
/// (vertically). For the top-left glyph that is its top-right corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageCorners {
    pub side: PageSide,
    pub points: [Point2<f32>; 4],
    /// Glyph centres, indexed by [`Corner`].
    pub centroids: [Point2<f32>; 4],
}

impl PageCorners {
    #[inline]
    pub fn corner(&self, corner: Corner) -> Point2<f32> {
        self.points[corner.index()]
    }
}

/// A page whose glyph set is incomplete or ambiguous.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{side} page: {}", describe(.missing, .duplicated))]
pub struct DetectionFailure {
    pub side: PageSide,
    /// Glyphs of this side that were not found.
    pub missing: Vec<Glyph>,
    /// Glyphs found more than once, with their counts.
    pub duplicated: Vec<(Glyph, usize)>,
}

fn describe(missing: &[Glyph], duplicated: &[(Glyph, usize)]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        let ids: Vec<String> = missing.iter().map(|g| g.to_string()).collect();
        parts.push(format!("missing glyph(s) {}", ids.join(", ")));
    }
    for (g, n) in duplicated {
        parts.push(format!("glyph {g} detected {n} times"));
    }
    parts.join("; ")
}

/// Outcome of assembly for both sides. `None` means the side was not requested.
#[derive(Clone, Debug, PartialEq)]
pub struct Assembly {
    pub left: Option<Result<PageCorners, DetectionFailure>>,
    pub right: Option<Result<PageCorners, DetectionFailure>>,
}

impl Assembly {
    pub fn side(&self, side: PageSide) -> Option<&Result<PageCorners, DetectionFailure>> {
        match side {
            PageSide::Left => self.left.as_ref(),
            PageSide::Right => self.right.as_ref(),
        }
    }
}

/// Collect the four corner glyphs of `side`. Exactly one detection per glyph
/// is required; every missing and every duplicated glyph is reported.
pub fn assemble_side(
    detections: &[MarkerDetection],
    side: PageSide,
) -> Result<PageCorners, DetectionFailure> {
    let mut found: [Vec<&MarkerDetection>; 4] = Default::default();
    for d in detections.iter().filter(|d| d.glyph.side() == side) {
        found[d.glyph.corner().index()].push(d);
    }

    let glyphs = side.glyphs();
    let missing: Vec<Glyph> = glyphs
        .iter()
        .zip(&found)
        .filter(|(_, f)| f.is_empty())
        .map(|(g, _)| *g)
        .collect();
    let duplicated: Vec<(Glyph, usize)> = glyphs
        .iter()
        .zip(&found)
        .filter(|(_, f)| f.len() > 1)
        .map(|(g, f)| (*g, f.len()))
        .collect();

    if !missing.is_empty() || !duplicated.is_empty() {
        return Err(DetectionFailure {
            side,
            missing,
            duplicated,
        });
    }

    Ok(PageCorners {
        side,
        points: Corner::ALL.map(|c| {
            found[c.index()][0].corners[page_corner_of_glyph(c).index()]
        }),
        centroids: Corner::ALL.map(|c| found[c.index()][0].centroid),
    })
}

/// Which canonical glyph corner marks the page corner `corner`.
pub fn page_corner_of_glyph(corner: Corner) -> Corner {
    match corner {
        Corner::TopLeft => Corner::TopRight,
        Corner::TopRight => Corner::TopLeft,
        Corner::BottomRight => Corner::BottomLeft,
        Corner::BottomLeft => Corner::BottomRight,
    }
}

/// Assemble the requested sides independently.
pub fn assemble(detections: &[MarkerDetection], want_left: bool, want_right: bool) -> Assembly {
    Assembly {
        left: want_left.then(|| assemble_side(detections, PageSide::Left)),
        right: want_right.then(|| assemble_side(detections, PageSide::Right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voussoir_glyph::Rotation;

    /// A 10 px glyph centred on `(x, y)`.
    fn det(id: u8, x: f32, y: f32) -> MarkerDetection {
        let glyph = Glyph::from_id(id).unwrap();
        MarkerDetection {
            glyph,
            centroid: Point2::new(x, y),
            corners: [(-5.0, -5.0), (5.0, -5.0), (5.0, 5.0), (-5.0, 5.0)]
                .map(|(dx, dy)| Point2::new(x + dx, y + dy)),
            rotation: Rotation::R0,
            hamming: 0,
            border_score: 1.0,
            score: 1.0,
            code: glyph.code(),
        }
    }

    #[test]
    fn page_corners_sit_on_inner_vertical_and_outer_horizontal_glyph_edges() {
        let dets = vec![
            det(2, 50.0, 90.0),
            det(0, 10.0, 10.0),
            det(3, 10.0, 90.0),
            det(1, 50.0, 10.0),
            det(5, 300.0, 10.0),
        ];
        let left = assemble_side(&dets, PageSide::Left).unwrap();
        assert_eq!(left.corner(Corner::TopLeft), Point2::new(15.0, 5.0));
        assert_eq!(left.corner(Corner::TopRight), Point2::new(45.0, 5.0));
        assert_eq!(left.corner(Corner::BottomRight), Point2::new(45.0, 95.0));
        assert_eq!(left.corner(Corner::BottomLeft), Point2::new(15.0, 95.0));
        assert_eq!(
            left.centroids,
            [(10.0, 10.0), (50.0, 10.0), (50.0, 90.0), (10.0, 90.0)].map(|(x, y)| Point2::new(x, y))
        );
    }

    #[test]
    fn page_corner_follows_glyph_rotation() {
        // Canonical glyph corners, not screen positions, pick the page corner.
        let mut d = det(4, 20.0, 20.0);
        d.corners = [d.corners[2], d.corners[3], d.corners[0], d.corners[1]];
        d.rotation = Rotation::R180;
        let dets = vec![d, det(5, 80.0, 20.0), det(6, 80.0, 120.0), det(7, 20.0, 120.0)];
        let right = assemble_side(&dets, PageSide::Right).unwrap();
        assert_eq!(right.corner(Corner::TopLeft), Point2::new(15.0, 25.0));
        assert_eq!(right.corner(Corner::TopRight), Point2::new(75.0, 15.0));
    }

    #[test]
    fn duplicate_and_missing_are_named_per_side() {
        let dets = vec![
            det(0, 10.0, 10.0),
            det(1, 50.0, 10.0),
            det(2, 50.0, 90.0),
            det(2, 52.0, 400.0),
            det(3, 10.0, 90.0),
        ];
        let a = assemble(&dets, true, true);

        let left = a.left.clone().unwrap().unwrap_err();
        assert!(left.missing.is_empty());
        assert_eq!(left.duplicated, vec![(Glyph::LeftBottomRight, 2)]);
        assert_eq!(left.to_string(), "left page: glyph 2 detected 2 times");

        let right = a.right.clone().unwrap().unwrap_err();
        assert_eq!(right.missing.iter().map(|g| g.id()).collect::<Vec<_>>(), vec![4, 5, 6, 7]);
        assert_eq!(right.to_string(), "right page: missing glyph(s) 4, 5, 6, 7");
    }

    #[test]
    fn unrequested_side_is_not_assembled() {
        let a = assemble(&[], true, false);
        assert!(a.right.is_none());
        assert!(a.side(PageSide::Right).is_none());
        assert!(matches!(a.left, Some(Err(_))));
    }
}
