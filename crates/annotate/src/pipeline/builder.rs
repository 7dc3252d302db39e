use crate::{
    algorithms::{DouglasPeuckerSimplifier, HoleFilling, MarchingSquaresTracer, MorphologicalCleanup},
    config::{ExtractionConfig, StructuringElement},
    pipeline::Pipeline,
    traits::{ContourTracer, MaskPreprocessor, PolygonSimplifier},
};

/// Builder for creating extraction pipelines with a fluent API
pub struct PipelineBuilder {
    config: ExtractionConfig,
    extra_preprocessors: Vec<Box<dyn MaskPreprocessor>>,
    hole_filler: Option<Box<dyn MaskPreprocessor>>,
    tracer: Option<Box<dyn ContourTracer>>,
    simplifier: Option<Box<dyn PolygonSimplifier>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with default options
    pub fn new() -> Self {
        Self::from_config(ExtractionConfig::default())
    }

    /// Start from an existing configuration
    pub fn from_config(config: ExtractionConfig) -> Self {
        Self {
            config,
            extra_preprocessors: Vec::new(),
            hole_filler: None,
            tracer: None,
            simplifier: None,
        }
    }

    pub fn remove_salt(mut self, enabled: bool) -> Self {
        self.config.remove_salt = enabled;
        self
    }

    pub fn rle_segmentations(mut self, enabled: bool) -> Self {
        self.config.rle_segmentations = enabled;
        self
    }

    pub fn float_annotations(mut self, enabled: bool) -> Self {
        self.config.float_annotations = enabled;
        self
    }

    pub fn max_categories(mut self, max: usize) -> Self {
        self.config.max_categories = max;
        self
    }

    pub fn structuring_element(mut self, element: StructuringElement) -> Self {
        self.config.structuring_element = element;
        self
    }

    pub fn simplify_tolerance(mut self, tolerance: f64) -> Self {
        self.config.simplify_tolerance = tolerance;
        self
    }

    pub fn contour_level(mut self, level: f64) -> Self {
        self.config.contour_level = level;
        self
    }

    /// Add a mask preprocessor that runs after the morphological cleanup
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: MaskPreprocessor + 'static,
    {
        self.extra_preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Set the hole filler (replaces the default one)
    pub fn set_hole_filler<H>(mut self, filler: H) -> Self
    where
        H: MaskPreprocessor + 'static,
    {
        self.hole_filler = Some(Box::new(filler));
        self
    }

    /// Set the contour tracer (replaces the marching-squares one)
    pub fn set_contour_tracer<T>(mut self, tracer: T) -> Self
    where
        T: ContourTracer + 'static,
    {
        self.tracer = Some(Box::new(tracer));
        self
    }

    /// Set the polygon simplifier (replaces Douglas-Peucker)
    pub fn set_simplifier<S>(mut self, simplifier: S) -> Self
    where
        S: PolygonSimplifier + 'static,
    {
        self.simplifier = Some(Box::new(simplifier));
        self
    }

    /// Build the pipeline with default components where none were given
    pub fn build(self) -> Pipeline {
        let cleanup = MorphologicalCleanup {
            close_after_open: self.config.remove_salt,
            element: self.config.structuring_element,
        };
        let mut preprocessors: Vec<Box<dyn MaskPreprocessor>> = vec![Box::new(cleanup)];
        preprocessors.extend(self.extra_preprocessors);

        let hole_filler = self.hole_filler.unwrap_or_else(|| Box::new(HoleFilling));
        let level = self.config.contour_level;
        let tracer = self
            .tracer
            .unwrap_or_else(|| Box::new(MarchingSquaresTracer { level }));
        let simplifier = self
            .simplifier
            .unwrap_or_else(|| Box::new(DouglasPeuckerSimplifier));

        Pipeline::new(self.config, preprocessors, hole_filler, tracer, simplifier)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
