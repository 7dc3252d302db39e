use std::panic::{self, UnwindSafe};

use geo::{Area, BooleanOps, Intersects};
use geo_types::MultiPolygon;
use tracing::warn;

use crate::{
    error::{AnnotateError, Result},
    rle::SegmentationRle,
    types::{Annotation, BoundingBox, CategoryColor, ContourPolygon, NormalizedAnnotation},
};

/// Combines the per-contour polygons of one category into an [`Annotation`]
#[derive(Debug, Clone, Default)]
pub struct AnnotationAggregator {
    pub float_annotations: bool,
}

impl AnnotationAggregator {
    pub fn new(float_annotations: bool) -> Self {
        Self { float_annotations }
    }

    /// `Ok(None)` when there is no geometry to annotate.
    pub fn aggregate(
        &self,
        color: CategoryColor,
        polygons: &[ContourPolygon],
        segmentation_rle: Option<SegmentationRle>,
        image_width: u32,
        image_height: u32,
    ) -> Result<Option<Annotation>> {
        if polygons.is_empty() {
            return Ok(None);
        }

        let segmentation: Vec<Vec<f64>> = polygons.iter().map(|p| p.segmentation()).collect();
        let areas: Vec<f64> = polygons.iter().map(|p| p.area()).collect();
        let bboxes = polygons
            .iter()
            .map(|p| {
                p.bbox().ok_or_else(|| {
                    AnnotateError::GeometricComputation(format!(
                        "contour of {:?} has no bounds",
                        color.0
                    ))
                })
            })
            .collect::<Result<Vec<BoundingBox>>>()?;

        let bbox = bboxes[1..]
            .iter()
            .fold(bboxes[0], |acc, b| acc.union(b));
        let area = union_area(polygons);

        let normalized = self.float_annotations.then(|| {
            let (w, h) = (image_width as f64, image_height as f64);
            let pixels = w * h;
            NormalizedAnnotation {
                segmentation_float: segmentation
                    .iter()
                    .map(|seg| normalize_coords(seg, w, h))
                    .collect(),
                bbox_float: bbox.normalized(image_width, image_height),
                area_float: (area / pixels).clamp(0.0, 1.0),
                bboxes_float: bboxes
                    .iter()
                    .map(|b| b.normalized(image_width, image_height))
                    .collect(),
                areas_float: areas.iter().map(|a| (a / pixels).clamp(0.0, 1.0)).collect(),
            }
        });

        Ok(Some(Annotation {
            color,
            segmentation,
            bbox,
            area,
            bboxes,
            areas,
            segmentation_rle,
            normalized,
        }))
    }
}

/// Area covered by the polygons without counting overlaps twice.
pub fn union_area(polygons: &[ContourPolygon]) -> f64 {
    let overlapping = polygons.iter().enumerate().any(|(i, a)| {
        polygons[i + 1..]
            .iter()
            .any(|b| a.polygon.intersects(&b.polygon))
    });
    if !overlapping {
        return polygons.iter().map(|p| p.area()).sum();
    }

    let summed = polygons.iter().map(|p| p.area()).sum();
    guarded_area(
        || {
            let first = MultiPolygon::new(vec![polygons[0].polygon.clone()]);
            let merged = polygons[1..].iter().fold(first, |acc, p| {
                acc.union(&MultiPolygon::new(vec![p.polygon.clone()]))
            });
            merged.unsigned_area()
        },
        summed,
    )
}

/// Run a boolean-ops area computation, falling back to `fallback` if it panics.
///
/// The sweep in `geo`'s boolean ops can panic on nearly collinear input.
fn guarded_area<F>(compute: F, fallback: f64) -> f64
where
    F: FnOnce() -> f64 + UnwindSafe,
{
    match panic::catch_unwind(compute) {
        Ok(area) => area,
        Err(_) => {
            warn!(fallback, "Polygon union failed, using summed contour area");
            fallback
        }
    }
}

/// `[x0, y0, x1, y1, ...]` divided by width/height and clamped into [0, 1].
fn normalize_coords(flat: &[f64], width: f64, height: f64) -> Vec<f64> {
    flat.iter()
        .enumerate()
        .map(|(k, v)| {
            let extent = if k % 2 == 0 { width } else { height };
            (v / extent).clamp(0.0, 1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Polygon};

    fn rect(x: f64, y: f64, w: f64, h: f64) -> ContourPolygon {
        let p: Polygon<f64> = polygon![
            (x: x, y: y),
            (x: x + w, y: y),
            (x: x + w, y: y + h),
            (x: x, y: y + h),
        ];
        ContourPolygon::new(p)
    }

    #[test]
    fn test_no_polygons_no_annotation() {
        let result = AnnotationAggregator::default()
            .aggregate(CategoryColor::new(1.0, 0.0, 0.0), &[], None, 10, 10)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_disjoint_contours_sum_and_union_bounds() {
        let polygons = [rect(1.0, 1.0, 2.0, 2.0), rect(6.0, 4.0, 3.0, 1.0)];
        let ann = AnnotationAggregator::default()
            .aggregate(CategoryColor::new(1.0, 0.0, 0.0), &polygons, None, 10, 10)
            .unwrap()
            .unwrap();
        assert_eq!(ann.segmentation.len(), 2);
        assert_eq!(ann.areas, vec![4.0, 3.0]);
        assert_eq!(ann.area, 7.0);
        assert_eq!(ann.bbox, BoundingBox::from([1.0, 1.0, 8.0, 4.0]));
        assert!(ann.normalized.is_none());
        assert!(ann.segmentation_rle.is_none());
    }

    #[test]
    fn test_overlapping_contours_are_not_double_counted() {
        let polygons = [rect(0.0, 0.0, 2.0, 2.0), rect(1.0, 0.0, 2.0, 2.0)];
        assert!((union_area(&polygons) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_float_variants_are_normalized() {
        let polygons = [rect(-0.5, 0.0, 4.0, 2.0)];
        let ann = AnnotationAggregator::new(true)
            .aggregate(CategoryColor::new(0.0, 1.0, 0.0), &polygons, None, 8, 4)
            .unwrap()
            .unwrap();
        let norm = ann.normalized.unwrap();
        assert!(norm.segmentation_float[0].iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(norm.bbox_float, BoundingBox::from([0.0, 0.0, 0.5, 0.5]));
        assert_eq!(norm.area_float, 0.25);
        assert_eq!(norm.areas_float, vec![0.25]);
        assert_eq!(norm.bboxes_float.len(), 1);
    }

    #[test]
    fn test_optional_fields_are_omitted_from_json() {
        let ann = AnnotationAggregator::default()
            .aggregate(CategoryColor::new(1.0, 1.0, 1.0), &[rect(0.0, 0.0, 1.0, 1.0)], None, 4, 4)
            .unwrap()
            .unwrap();
        let json = serde_json::to_value(&ann).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in ["color", "segmentation", "bbox", "area", "bboxes", "areas"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert!(!keys.contains(&"segmentation_rle"));
        assert!(!keys.contains(&"bbox_float"));
    }

    #[test]
    fn test_union_panic_falls_back_to_sum() {
        assert_eq!(guarded_area(|| 6.0, 8.0), 6.0);
        let area = guarded_area(|| panic!("sweep line lost an edge"), 8.0);
        assert_eq!(area, 8.0);
    }
}
