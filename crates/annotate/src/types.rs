use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use geo::{Area, BoundingRect};
use geo_types::{Polygon, Rect};
use image::{DynamicImage, ImageBuffer, Rgb, Rgb32FImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AnnotateError, Result},
    rle::SegmentationRle,
};

/// A traced boundary loop in padded (row, col) pixel space.
pub type Contour = Vec<[f64; 2]>;

/// Exact channel triplet identifying one semantic category.
///
/// Ordering is lexicographic over the channel values, which fixes the order
/// annotations are emitted in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryColor(pub [f32; 3]);

impl CategoryColor {
    pub const BACKGROUND: CategoryColor = CategoryColor([0.0, 0.0, 0.0]);

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self([r, g, b])
    }

    pub fn is_background(&self) -> bool {
        self.0.iter().all(|&c| c == 0.0)
    }
}

impl PartialEq for CategoryColor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CategoryColor {}

impl PartialOrd for CategoryColor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CategoryColor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl Hash for CategoryColor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for channel in self.0 {
            channel.to_bits().hash(state);
        }
    }
}

impl From<Rgb<f32>> for CategoryColor {
    fn from(pixel: Rgb<f32>) -> Self {
        Self(pixel.0)
    }
}

/// A color-coded segmentation raster with channels normalized to [0, 1].
#[derive(Debug, Clone)]
pub struct SegmentationImage {
    pixels: Rgb32FImage,
}

impl SegmentationImage {
    /// Wrap an already normalized float raster.
    pub fn from_rgb32f(mut pixels: Rgb32FImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(AnnotateError::InvalidImage(format!(
                "empty raster ({}x{})",
                pixels.width(),
                pixels.height()
            )));
        }
        for pixel in pixels.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                if !channel.is_finite() {
                    return Err(AnnotateError::InvalidImage(
                        "non-finite channel value".to_string(),
                    ));
                }
                // Fold -0.0 into 0.0 so it can never form its own category.
                if *channel == 0.0 {
                    *channel = 0.0;
                }
            }
        }
        Ok(Self { pixels })
    }

    /// Normalize an 8-bit RGB raster.
    pub fn from_rgb8(image: &RgbImage) -> Result<Self> {
        let pixels = ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
            let Rgb([r, g, b]) = *image.get_pixel(x, y);
            Rgb([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0])
        });
        Self::from_rgb32f(pixels)
    }

    /// Convert a decoded image, dropping any alpha channel.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        let channels = image.color().channel_count();
        if channels < 3 {
            return Err(AnnotateError::InvalidImage(format!(
                "expected at least 3 channels, found {channels}"
            )));
        }
        Self::from_rgb32f(image.to_rgb32f())
    }

    /// Build from an interleaved `(height, width, channels)` buffer.
    ///
    /// Channels past the third are ignored. A buffer whose maximum exceeds
    /// 2.0 is taken to be on the 0-255 scale and divided by 255.
    pub fn from_raw(height: u32, width: u32, channels: usize, data: &[f32]) -> Result<Self> {
        if channels < 3 {
            return Err(AnnotateError::InvalidImage(format!(
                "expected at least 3 channels, found {channels}"
            )));
        }
        let expected = height as usize * width as usize * channels;
        if data.len() != expected {
            return Err(AnnotateError::InvalidImage(format!(
                "buffer holds {} values, expected {expected} for {height}x{width}x{channels}",
                data.len()
            )));
        }

        let scale = if data.iter().any(|&v| v > 2.0) { 255.0 } else { 1.0 };
        let rgb: Vec<f32> = data
            .chunks_exact(channels)
            .flat_map(|px| px[..3].iter().map(|&v| v / scale))
            .collect();

        let pixels = Rgb32FImage::from_raw(width, height, rgb).ok_or_else(|| {
            AnnotateError::InvalidImage("buffer does not match dimensions".to_string())
        })?;
        Self::from_rgb32f(pixels)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn color_at(&self, x: u32, y: u32) -> CategoryColor {
        CategoryColor::from(*self.pixels.get_pixel(x, y))
    }

    /// All pixel colors in row-major order.
    pub fn colors(&self) -> impl Iterator<Item = CategoryColor> + '_ {
        self.pixels.pixels().map(|p| CategoryColor::from(*p))
    }

    pub fn as_rgb32f(&self) -> &Rgb32FImage {
        &self.pixels
    }
}

/// Axis-aligned box serialized as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self {
            x: rect.min().x,
            y: rect.min().y,
            width: rect.width(),
            height: rect.height(),
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoundingBox {
            x,
            y,
            width: self.max_x().max(other.max_x()) - x,
            height: self.max_y().max(other.max_y()) - y,
        }
    }

    /// Express the box as fractions of the image, clamped into [0, 1].
    pub fn normalized(&self, image_width: u32, image_height: u32) -> BoundingBox {
        let (w, h) = (image_width as f64, image_height as f64);
        BoundingBox {
            x: (self.x / w).clamp(0.0, 1.0),
            y: (self.y / h).clamp(0.0, 1.0),
            width: (self.width / w).clamp(0.0, 1.0),
            height: (self.height / h).clamp(0.0, 1.0),
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self { x, y, width, height }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One simplified contour in image (x, y) space.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourPolygon {
    pub polygon: Polygon<f64>,
}

impl ContourPolygon {
    pub fn new(polygon: Polygon<f64>) -> Self {
        Self { polygon }
    }

    /// Closed exterior ring flattened to `[x0, y0, x1, y1, ...]`.
    pub fn segmentation(&self) -> Vec<f64> {
        self.polygon
            .exterior()
            .coords()
            .flat_map(|c| [c.x, c.y])
            .collect()
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.polygon.bounding_rect().map(BoundingBox::from_rect)
    }

    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }
}

/// Width/height normalized companions of an [`Annotation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAnnotation {
    pub segmentation_float: Vec<Vec<f64>>,
    pub bbox_float: BoundingBox,
    pub area_float: f64,
    pub bboxes_float: Vec<BoundingBox>,
    pub areas_float: Vec<f64>,
}

/// Annotation of every region belonging to one category color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub color: CategoryColor,
    pub segmentation: Vec<Vec<f64>>,
    pub bbox: BoundingBox,
    pub area: f64,
    pub bboxes: Vec<BoundingBox>,
    pub areas: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_rle: Option<SegmentationRle>,
    #[serde(flatten)]
    pub normalized: Option<NormalizedAnnotation>,
}

/// All annotations extracted from one image, in ascending color order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub image_width: u32,
    pub image_height: u32,
    pub annotations: Vec<Annotation>,
}

impl AnnotationSet {
    pub fn new(image_width: u32, image_height: u32) -> Self {
        Self {
            image_width,
            image_height,
            annotations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.annotations.iter()
    }

    pub fn colors(&self) -> Vec<CategoryColor> {
        self.annotations.iter().map(|a| a.color).collect()
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.annotations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn test_color_ordering_is_lexicographic() {
        let mut colors = vec![
            CategoryColor::new(0.5, 0.0, 0.0),
            CategoryColor::new(0.0, 1.0, 0.0),
            CategoryColor::new(0.0, 0.2, 0.9),
            CategoryColor::BACKGROUND,
        ];
        colors.sort();
        assert_eq!(colors[0], CategoryColor::BACKGROUND);
        assert_eq!(colors[1], CategoryColor::new(0.0, 0.2, 0.9));
        assert_eq!(colors[2], CategoryColor::new(0.0, 1.0, 0.0));
        assert_eq!(colors[3], CategoryColor::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_from_raw_rejects_two_channels() {
        let err = SegmentationImage::from_raw(2, 2, 2, &[0.0; 8]).unwrap_err();
        assert!(matches!(err, AnnotateError::InvalidImage(_)));
    }

    #[test]
    fn test_from_raw_rejects_length_mismatch() {
        let err = SegmentationImage::from_raw(2, 2, 3, &[0.0; 11]).unwrap_err();
        assert!(matches!(err, AnnotateError::InvalidImage(_)));
    }

    #[test]
    fn test_from_raw_rejects_empty() {
        let err = SegmentationImage::from_raw(0, 4, 3, &[]).unwrap_err();
        assert!(matches!(err, AnnotateError::InvalidImage(_)));
    }

    #[test]
    fn test_from_raw_drops_alpha_and_rescales() {
        let data = [255.0, 0.0, 0.0, 255.0, 0.0, 0.0, 0.0, 255.0];
        let image = SegmentationImage::from_raw(1, 2, 4, &data).unwrap();
        assert_eq!(image.color_at(0, 0), CategoryColor::new(1.0, 0.0, 0.0));
        assert_eq!(image.color_at(1, 0), CategoryColor::BACKGROUND);
    }

    #[test]
    fn test_from_dynamic_rejects_grayscale() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(3, 3));
        assert!(SegmentationImage::from_dynamic(&gray).is_err());
    }

    #[test]
    fn test_bbox_serializes_as_array() {
        let bbox = BoundingBox::from([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(serde_json::to_string(&bbox).unwrap(), "[1.0,2.0,3.0,4.0]");
    }

    #[test]
    fn test_bbox_union() {
        let a = BoundingBox::from([0.0, 0.0, 2.0, 2.0]);
        let b = BoundingBox::from([5.0, 1.0, 1.0, 4.0]);
        assert_eq!(a.union(&b), BoundingBox::from([0.0, 0.0, 6.0, 5.0]));
    }

    #[test]
    fn test_normalized_bbox_is_clamped() {
        let bbox = BoundingBox::from([-0.01, 0.0, 10.02, 5.0]);
        let n = bbox.normalized(10, 5);
        assert_eq!(n.x, 0.0);
        assert_eq!(n.width, 1.0);
        assert_eq!(n.height, 1.0);
    }

    #[test]
    fn test_contour_polygon_measurements() {
        let shape = ContourPolygon::new(polygon![
            (x: 1.0, y: 1.0),
            (x: 4.0, y: 1.0),
            (x: 4.0, y: 3.0),
            (x: 1.0, y: 3.0),
        ]);
        assert_eq!(shape.area(), 6.0);
        assert_eq!(shape.bbox(), Some(BoundingBox::from([1.0, 1.0, 3.0, 2.0])));
        let seg = shape.segmentation();
        assert_eq!(seg.len(), 10);
        assert_eq!(&seg[..2], &seg[8..]);
    }
}
