pub mod builder;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    algorithms::{
        discover_categories, isolate_category, AnnotationAggregator, BorderPadding,
        PolygonBuilder,
    },
    config::ExtractionConfig,
    error::Result,
    rle::SegmentationRle,
    traits::{ContourTracer, MaskPreprocessor, PolygonSimplifier},
    types::{Annotation, AnnotationSet, CategoryColor, ContourPolygon, SegmentationImage},
};

/// Segmentation-to-annotation pipeline, one instance per configuration
pub struct Pipeline {
    config: ExtractionConfig,
    preprocessors: Vec<Box<dyn MaskPreprocessor>>,
    padding: BorderPadding,
    hole_filler: Box<dyn MaskPreprocessor>,
    tracer: Box<dyn ContourTracer>,
    simplifier: Box<dyn PolygonSimplifier>,
    aggregator: AnnotationAggregator,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Pipeline with the default stages configured from `config`
    pub fn from_config(config: ExtractionConfig) -> Self {
        builder::PipelineBuilder::from_config(config).build()
    }

    pub(crate) fn new(
        config: ExtractionConfig,
        preprocessors: Vec<Box<dyn MaskPreprocessor>>,
        hole_filler: Box<dyn MaskPreprocessor>,
        tracer: Box<dyn ContourTracer>,
        simplifier: Box<dyn PolygonSimplifier>,
    ) -> Self {
        let aggregator = AnnotationAggregator::new(config.float_annotations);
        Self {
            config,
            preprocessors,
            padding: BorderPadding::default(),
            hole_filler,
            tracer,
            simplifier,
            aggregator,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Annotate every non-background category of the image.
    ///
    /// Invalid options, too many categories or an invalid image abort the
    /// call. Any other problem with a single category only drops that category.
    pub fn process(&self, image: &SegmentationImage) -> Result<AnnotationSet> {
        self.config.validate()?;
        let colors = discover_categories(image, self.config.max_categories)?;
        info!(
            width = image.width(),
            height = image.height(),
            categories = colors.len(),
            "Extracting annotations from segmentation"
        );

        let mut set = AnnotationSet::new(image.width(), image.height());
        for color in colors {
            if color.is_background() {
                debug!("Color is background");
                continue;
            }
            match self.annotate_category(image, color) {
                Ok(Some(annotation)) => set.annotations.push(annotation),
                Ok(None) => debug!(color = ?color.0, "No contours after cleanup, skipping"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(color = ?color.0, error = %e, "Skipping category"),
            }
        }
        Ok(set)
    }

    /// Run [`Pipeline::process`] over many images on the rayon pool.
    ///
    /// Slot `i` of the output always holds the result for `images[i]`.
    pub fn process_batch(&self, images: &[SegmentationImage]) -> Vec<Result<AnnotationSet>> {
        images.par_iter().map(|image| self.process(image)).collect()
    }

    /// Cleaned, padded and hole-filled mask of one category.
    pub fn category_mask(
        &self,
        image: &SegmentationImage,
        color: CategoryColor,
    ) -> Result<image::GrayImage> {
        let mut mask = isolate_category(image, color);
        for preprocessor in &self.preprocessors {
            mask = preprocessor.preprocess(&mask)?;
        }
        let padded = self.padding.preprocess(&mask)?;
        self.hole_filler.preprocess(&padded)
    }

    /// Annotation for a single color, `None` when nothing survives cleanup.
    pub fn annotate_category(
        &self,
        image: &SegmentationImage,
        color: CategoryColor,
    ) -> Result<Option<Annotation>> {
        let filled = self.category_mask(image, color)?;

        let contours = self.tracer.trace(&filled)?;
        debug!(color = ?color.0, count = contours.len(), "Found contours");
        if contours.is_empty() {
            return Ok(None);
        }

        let builder = PolygonBuilder {
            padding: self.padding.width,
            tolerance: self.config.simplify_tolerance,
        };
        let polygons: Vec<ContourPolygon> = contours
            .iter()
            .filter_map(|contour| builder.build(contour, self.simplifier.as_ref()))
            .collect();

        let segmentation_rle = self
            .config
            .rle_segmentations
            .then(|| SegmentationRle::encode(&self.padding.crop(&filled)));

        self.aggregator.aggregate(
            color,
            &polygons,
            segmentation_rle,
            image.width(),
            image.height(),
        )
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} mask preprocessors, padding {}, simplify tolerance {}, contour level {}",
            self.preprocessors.len(),
            self.padding.width,
            self.config.simplify_tolerance,
            self.config.contour_level
        )
    }
}
