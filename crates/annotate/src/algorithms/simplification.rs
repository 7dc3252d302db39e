use geo::{Area, Intersects};
use geo_types::{Coord, Line, LineString, Polygon};

use crate::{
    traits::PolygonSimplifier,
    types::{Contour, ContourPolygon},
};

/// Douglas-Peucker simplifier using geo crate's implementation.
///
/// Falls back to the input polygon whenever the simplified ring would be
/// degenerate or self-intersecting.
#[derive(Debug, Clone, Default)]
pub struct DouglasPeuckerSimplifier;

impl PolygonSimplifier for DouglasPeuckerSimplifier {
    fn simplify(&self, polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
        use geo::Simplify;

        let simplified = polygon.simplify(&tolerance);
        if is_degenerate(simplified.exterior()) || self_intersects(simplified.exterior()) {
            polygon.clone()
        } else {
            simplified
        }
    }
}

/// A closed ring with fewer than three distinct vertices or no area.
pub fn is_degenerate(ring: &LineString<f64>) -> bool {
    ring.0.len() < 4 || Polygon::new(ring.clone(), vec![]).unsigned_area() <= f64::EPSILON
}

/// Whether two non-adjacent edges of a closed ring touch.
pub fn self_intersects(ring: &LineString<f64>) -> bool {
    let lines: Vec<Line<f64>> = ring.lines().collect();
    let n = lines.len();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if lines[i].intersects(&lines[j]) {
                return true;
            }
        }
    }
    false
}

/// Turns traced contours into simplified polygons in image (x, y) space
#[derive(Debug, Clone)]
pub struct PolygonBuilder {
    /// Frame width added before tracing, subtracted from every point
    pub padding: u32,
    pub tolerance: f64,
}

impl Default for PolygonBuilder {
    fn default() -> Self {
        Self {
            padding: 1,
            tolerance: 1.0,
        }
    }
}

impl PolygonBuilder {
    /// Returns `None` when the contour does not enclose any area.
    pub fn build(
        &self,
        contour: &Contour,
        simplifier: &dyn PolygonSimplifier,
    ) -> Option<ContourPolygon> {
        let offset = self.padding as f64;
        let coords: Vec<Coord<f64>> = contour
            .iter()
            .map(|&[row, col]| Coord {
                x: col - offset,
                y: row - offset,
            })
            .collect();

        let polygon = Polygon::new(LineString::new(coords), vec![]);
        if is_degenerate(polygon.exterior()) {
            return None;
        }

        Some(ContourPolygon::new(
            simplifier.simplify(&polygon, self.tolerance),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn test_collinear_points_are_removed() {
        let dense = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 2.0),
            (x: 4.0, y: 4.0),
            (x: 2.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 2.0),
        ];
        let simplified = DouglasPeuckerSimplifier.simplify(&dense, 1.0);
        assert_eq!(simplified.exterior().0.len(), 5);
        assert_eq!(simplified.unsigned_area(), 16.0);
    }

    #[test]
    fn test_collapse_falls_back_to_input() {
        let sliver = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.5),
            (x: 20.0, y: 0.0),
            (x: 10.0, y: 0.4),
        ];
        let simplified = DouglasPeuckerSimplifier.simplify(&sliver, 1.0);
        assert!(!is_degenerate(simplified.exterior()));
        assert!(simplified.unsigned_area() > 0.0);
    }

    #[test]
    fn test_self_intersection_detected() {
        let bowtie = LineString::from(vec![
            (0.0, 0.0),
            (2.0, 2.0),
            (2.0, 0.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ]);
        assert!(self_intersects(&bowtie));

        let square = LineString::from(vec![
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ]);
        assert!(!self_intersects(&square));
    }

    #[test]
    fn test_builder_undoes_padding_and_axis_order() {
        // (row, col) square around padded pixels rows 2..4, cols 3..5
        let contour = vec![
            [2.0, 3.0],
            [2.0, 5.0],
            [4.0, 5.0],
            [4.0, 3.0],
            [2.0, 3.0],
        ];
        let shape = PolygonBuilder::default()
            .build(&contour, &DouglasPeuckerSimplifier)
            .unwrap();
        let bbox = shape.bbox().unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (2.0, 1.0, 2.0, 2.0));
        assert_eq!(shape.area(), 4.0);
    }

    #[test]
    fn test_builder_drops_flat_contour() {
        let contour = vec![[1.0, 1.0], [1.0, 3.0], [1.0, 1.0]];
        assert!(PolygonBuilder::default()
            .build(&contour, &DouglasPeuckerSimplifier)
            .is_none());
    }
}
