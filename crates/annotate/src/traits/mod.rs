use geo_types::Polygon;
use image::GrayImage;

use crate::{error::Result, types::Contour};

/// Trait for binary mask preprocessing (noise removal, padding, filling)
pub trait MaskPreprocessor: Send + Sync {
    /// Transform a 0/255 mask into another 0/255 mask
    fn preprocess(&self, mask: &GrayImage) -> Result<GrayImage>;
}

/// Trait for contour tracing algorithms
pub trait ContourTracer: Send + Sync {
    /// Trace closed boundary loops of a padded binary mask in (row, col) space
    fn trace(&self, mask: &GrayImage) -> Result<Vec<Contour>>;
}

/// Trait for polygon simplification algorithms
pub trait PolygonSimplifier: Send + Sync {
    /// Simplify a polygon without breaking its topology
    fn simplify(&self, polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64>;
}
