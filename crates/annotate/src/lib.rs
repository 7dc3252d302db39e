//! # Segmentation Annotation Library
//!
//! Converts a color-coded segmentation raster into object annotations:
//! polygons, bounding boxes, areas and optional run-length encoded masks,
//! in the shape expected by detection and instance-segmentation datasets.
//!
//! ## Core Features
//!
//! - **Category discovery**: every distinct non-black color is one category
//! - **Mask cleanup**: morphological opening/closing removes salt noise
//! - **Closed contours**: border padding and hole filling before tracing
//! - **Marching squares**: iso-contours with a fixed winding
//! - **Simplification**: topology-safe Douglas-Peucker via `geo`
//! - **RLE**: column-major run-length encoding of the category mask
//! - **GeoJSON Support**: export an annotation set as a feature collection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use annotate::{ExtractionConfig, Pipeline, SegmentationImage};
//!
//! let image = SegmentationImage::from_dynamic(&image::open("seg.png")?)?;
//! let pipeline = Pipeline::from_config(ExtractionConfig::default());
//! let annotations = pipeline.process(&image)?;
//!
//! for annotation in &annotations {
//!     println!("{:?}: area {:.1}", annotation.color, annotation.area);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use annotate::{Pipeline, StructuringElement};
//!
//! let pipeline = Pipeline::builder()
//!     .structuring_element(StructuringElement::Cross)
//!     .rle_segmentations(true)
//!     .float_annotations(true)
//!     .simplify_tolerance(2.0)
//!     .build();
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod config;
pub mod traits;
pub mod algorithms;
pub mod rle;
pub mod pipeline;
pub mod io;
pub mod stats;

// Re-exports for convenience
pub use error::{AnnotateError, Result};
pub use types::{
    Annotation, AnnotationSet, BoundingBox, CategoryColor, Contour, ContourPolygon,
    NormalizedAnnotation, SegmentationImage,
};
pub use config::{ExtractionConfig, StructuringElement};
pub use traits::*;
pub use algorithms::*;
pub use rle::SegmentationRle;
pub use pipeline::{builder::PipelineBuilder, Pipeline};
pub use stats::PixelStats;

/// Extract the annotations of one image with the given options.
pub fn extract_annotations(
    image: &SegmentationImage,
    config: &ExtractionConfig,
) -> Result<AnnotationSet> {
    Pipeline::from_config(config.clone()).process(image)
}

/// Extract many images in parallel; slot `i` holds the result for `images[i]`.
pub fn extract_batch(
    images: &[SegmentationImage],
    config: &ExtractionConfig,
) -> Vec<Result<AnnotationSet>> {
    Pipeline::from_config(config.clone()).process_batch(images)
}
