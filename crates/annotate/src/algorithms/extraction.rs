use std::collections::HashMap;

use image::GrayImage;

use crate::{
    error::{AnnotateError, Result},
    traits::ContourTracer,
    types::Contour,
};

/// Marching-squares iso-contour tracer.
///
/// Every emitted loop is closed (first point repeated at the end) and wound
/// so its shoelace area in (col, row) order is positive. Saddle cells keep
/// background connected across the diagonal, so foreground pixels that only
/// touch at a corner trace as separate loops.
#[derive(Debug, Clone)]
pub struct MarchingSquaresTracer {
    pub level: f64,
}

impl Default for MarchingSquaresTracer {
    fn default() -> Self {
        Self { level: 0.01 }
    }
}

/// Cell edge identified by its first pixel in (row, col).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    /// Between (r, c) and (r, c + 1)
    Horizontal(u32, u32),
    /// Between (r, c) and (r + 1, c)
    Vertical(u32, u32),
}

impl MarchingSquaresTracer {
    fn sample(mask: &GrayImage, row: u32, col: u32) -> f64 {
        mask.get_pixel(col, row)[0] as f64 / 255.0
    }

    fn crossing(&self, mask: &GrayImage, edge: Edge) -> [f64; 2] {
        let (r, c, r1, c1) = match edge {
            Edge::Horizontal(r, c) => (r, c, r, c + 1),
            Edge::Vertical(r, c) => (r, c, r + 1, c),
        };
        let v0 = Self::sample(mask, r, c);
        let v1 = Self::sample(mask, r1, c1);
        let t = (self.level - v0) / (v1 - v0);
        [
            r as f64 + t * (r1 as f64 - r as f64),
            c as f64 + t * (c1 as f64 - c as f64),
        ]
    }

    fn cell_segments(&self, mask: &GrayImage, r: u32, c: u32, out: &mut Vec<(Edge, Edge)>) {
        let high = |row, col| Self::sample(mask, row, col) > self.level;
        let case = high(r, c) as u8
            | (high(r, c + 1) as u8) << 1
            | (high(r + 1, c) as u8) << 2
            | (high(r + 1, c + 1) as u8) << 3;

        let top = Edge::Horizontal(r, c);
        let bottom = Edge::Horizontal(r + 1, c);
        let left = Edge::Vertical(r, c);
        let right = Edge::Vertical(r, c + 1);

        match case {
            1 | 14 => out.push((top, left)),
            2 | 13 => out.push((top, right)),
            3 | 12 => out.push((left, right)),
            4 | 11 => out.push((left, bottom)),
            5 | 10 => out.push((top, bottom)),
            7 | 8 => out.push((bottom, right)),
            6 => {
                out.push((top, right));
                out.push((left, bottom));
            }
            9 => {
                out.push((top, left));
                out.push((bottom, right));
            }
            _ => {}
        }
    }

    fn orient(mut contour: Contour) -> Contour {
        // Shoelace in (x, y) = (col, row).
        let twice_area: f64 = contour
            .windows(2)
            .map(|w| w[0][1] * w[1][0] - w[1][1] * w[0][0])
            .sum();
        if twice_area < 0.0 {
            contour.reverse();
        }
        contour
    }
}

impl ContourTracer for MarchingSquaresTracer {
    fn trace(&self, mask: &GrayImage) -> Result<Vec<Contour>> {
        let (width, height) = mask.dimensions();
        if width < 2 || height < 2 {
            return Ok(Vec::new());
        }

        let border_lit = (0..width)
            .flat_map(|x| [(x, 0), (x, height - 1)])
            .chain((0..height).flat_map(|y| [(0, y), (width - 1, y)]))
            .any(|(x, y)| Self::sample(mask, y, x) > self.level);
        if border_lit {
            return Err(AnnotateError::GeometricComputation(
                "mask must have a background border to trace closed contours".to_string(),
            ));
        }

        let mut segments = Vec::new();
        for r in 0..height - 1 {
            for c in 0..width - 1 {
                self.cell_segments(mask, r, c, &mut segments);
            }
        }

        let mut incident: HashMap<Edge, Vec<usize>> = HashMap::new();
        for (i, (a, b)) in segments.iter().enumerate() {
            incident.entry(*a).or_default().push(i);
            incident.entry(*b).or_default().push(i);
        }

        let mut visited = vec![false; segments.len()];
        let mut contours = Vec::new();

        for start in 0..segments.len() {
            if visited[start] {
                continue;
            }
            visited[start] = true;

            let (first, mut current) = segments[start];
            let mut points = vec![self.crossing(mask, first), self.crossing(mask, current)];

            while current != first {
                let next = incident
                    .get(&current)
                    .and_then(|segs| segs.iter().copied().find(|&s| !visited[s]));
                let Some(next) = next else {
                    return Err(AnnotateError::GeometricComputation(format!(
                        "contour left open at {:?}",
                        current
                    )));
                };
                visited[next] = true;
                let (a, b) = segments[next];
                current = if a == current { b } else { a };
                points.push(self.crossing(mask, current));
            }

            contours.push(Self::orient(points));
        }

        Ok(contours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with(size: (u32, u32), lit: &[(u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(size.0, size.1);
        for &(x, y) in lit {
            mask.put_pixel(x, y, Luma([255u8]));
        }
        mask
    }

    fn signed_area(contour: &Contour) -> f64 {
        contour
            .windows(2)
            .map(|w| w[0][1] * w[1][0] - w[1][1] * w[0][0])
            .sum::<f64>()
            / 2.0
    }

    #[test]
    fn test_single_pixel_traces_diamond() {
        let mask = mask_with((3, 3), &[(1, 1)]);
        let contours = MarchingSquaresTracer::default().trace(&mask).unwrap();
        assert_eq!(contours.len(), 1);

        let contour = &contours[0];
        assert_eq!(contour.len(), 5);
        assert_eq!(contour.first(), contour.last());
        for [r, c] in contour {
            let d = (r - 1.0).abs() + (c - 1.0).abs();
            assert!((d - 0.99).abs() < 1e-9, "point ({r}, {c}) off the diamond");
        }
        assert!((signed_area(contour) - 2.0 * 0.99 * 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_empty_mask_has_no_contours() {
        let mask = GrayImage::new(6, 6);
        assert!(MarchingSquaresTracer::default().trace(&mask).unwrap().is_empty());
    }

    #[test]
    fn test_separate_blobs_trace_separately() {
        let mask = mask_with((8, 5), &[(1, 1), (2, 1), (5, 2), (6, 2), (5, 3), (6, 3)]);
        let contours = MarchingSquaresTracer::default().trace(&mask).unwrap();
        assert_eq!(contours.len(), 2);
        assert!(contours.iter().all(|c| signed_area(c) > 0.0));
    }

    #[test]
    fn test_diagonal_neighbours_are_not_joined() {
        let mask = mask_with((4, 4), &[(1, 1), (2, 2)]);
        let contours = MarchingSquaresTracer::default().trace(&mask).unwrap();
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn test_lit_border_is_rejected() {
        let mask = mask_with((3, 3), &[(0, 1)]);
        assert!(MarchingSquaresTracer::default().trace(&mask).is_err());
    }

    #[test]
    fn test_ring_traces_outer_and_inner_loops() {
        let mut lit = Vec::new();
        for y in 1..6 {
            for x in 1..6 {
                if !(x == 3 && y == 3) {
                    lit.push((x, y));
                }
            }
        }
        let mask = mask_with((7, 7), &lit);
        let contours = MarchingSquaresTracer::default().trace(&mask).unwrap();
        assert_eq!(contours.len(), 2);
    }
}
