use imageproc::distance_transform::Norm;
use schemars::{
    r#gen::SchemaGenerator,
    schema::{Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::{AnnotateError, Result};

/// Neighborhood used by the morphological cleanup.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StructuringElement {
    /// 3x3 block (L-infinity radius 1)
    #[default]
    Square,
    /// 4-neighborhood plus centre (L1 radius 1)
    Cross,
}

impl StructuringElement {
    pub fn norm(&self) -> Norm {
        match self {
            Self::Square => Norm::LInf,
            Self::Cross => Norm::L1,
        }
    }
}

/// Options for one extraction call. Passed explicitly into the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    #[schemars(description = "Apply a closing pass after the opening pass")]
    pub remove_salt: bool,

    #[schemars(description = "Attach a run-length encoded mask to each annotation")]
    pub rle_segmentations: bool,

    #[schemars(description = "Attach coordinates normalized by image width and height")]
    pub float_annotations: bool,

    #[schemars(description = "Maximum number of distinct colors, background included")]
    pub max_categories: usize,

    #[schemars(description = "Neighborhood used by opening and closing")]
    pub structuring_element: StructuringElement,

    #[schemars(
        description = "Douglas-Peucker tolerance in pixels",
        range(min = 0.0)
    )]
    pub simplify_tolerance: f64,

    #[schemars(schema_with = "contour_level_schema")]
    pub contour_level: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            remove_salt: true,
            rle_segmentations: false,
            float_annotations: false,
            max_categories: 300,
            structuring_element: StructuringElement::Square,
            simplify_tolerance: 1.0,
            contour_level: 0.01,
        }
    }
}

impl ExtractionConfig {
    /// Get the JSON schema for the configuration
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ExtractionConfig)
    }

    /// Reject options that would make every category trace to nothing.
    pub fn validate(&self) -> Result<()> {
        // Written so NaN fails too.
        if !(self.contour_level > 0.0 && self.contour_level < 1.0) {
            return Err(AnnotateError::InvalidConfig(format!(
                "contour_level must lie strictly between 0 and 1, got {}",
                self.contour_level
            )));
        }
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err(AnnotateError::InvalidConfig(format!(
                "simplify_tolerance must be a finite, non-negative number of pixels, got {}",
                self.simplify_tolerance
            )));
        }
        Ok(())
    }
}

/// Mask values are 0 or 1, so only levels strictly between them cross an edge.
fn contour_level_schema(generator: &mut SchemaGenerator) -> Schema {
    let mut schema: SchemaObject = <f64>::json_schema(generator).into_object();
    schema.metadata().description =
        Some("Iso-level used when tracing the binary mask, strictly between 0 and 1".to_string());
    let number = schema.number();
    number.exclusive_minimum = Some(0.0);
    number.exclusive_maximum = Some(1.0);
    schema.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert!(config.remove_salt);
        assert!(!config.rle_segmentations);
        assert!(!config.float_annotations);
        assert_eq!(config.max_categories, 300);
        assert_eq!(config.simplify_tolerance, 1.0);
        assert_eq!(config.contour_level, 0.01);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ExtractionConfig =
            serde_json::from_str(r#"{"float_annotations": true, "structuring_element": "cross"}"#)
                .unwrap();
        assert!(config.float_annotations);
        assert!(config.remove_salt);
        assert_eq!(config.structuring_element, StructuringElement::Cross);
    }

    #[test]
    fn test_structuring_element_parses() {
        assert_eq!(
            StructuringElement::from_str("square").unwrap(),
            StructuringElement::Square
        );
        assert_eq!(StructuringElement::Cross.to_string(), "cross");
        assert_eq!(StructuringElement::VARIANTS, &["square", "cross"]);
    }

    #[test]
    fn test_schema_lists_options() {
        let schema = serde_json::to_value(ExtractionConfig::schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("max_categories").is_some());
        assert!(properties.get("rle_segmentations").is_some());
        assert_eq!(properties["contour_level"]["exclusiveMinimum"], 0.0);
        assert_eq!(properties["contour_level"]["exclusiveMaximum"], 1.0);
        assert_eq!(properties["simplify_tolerance"]["minimum"], 0.0);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ExtractionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_contour_level_outside_unit_interval_is_rejected() {
        for level in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let config = ExtractionConfig {
                contour_level: level,
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(matches!(err, AnnotateError::InvalidConfig(_)), "level {level}");
            assert!(err.is_fatal());
        }
    }

    #[test]
    fn test_bad_simplify_tolerance_is_rejected() {
        for tolerance in [-1.0, f64::INFINITY, f64::NAN] {
            let config = ExtractionConfig {
                simplify_tolerance: tolerance,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(AnnotateError::InvalidConfig(_))
            ));
        }
        let exact = ExtractionConfig {
            simplify_tolerance: 0.0,
            ..Default::default()
        };
        assert!(exact.validate().is_ok());
    }

    #[test]
    fn test_default_element_is_square() {
        assert_eq!(ExtractionConfig::default().structuring_element, StructuringElement::Square);
        assert!(matches!(StructuringElement::Square.norm(), Norm::LInf));
        assert!(matches!(StructuringElement::Cross.norm(), Norm::L1));
    }
}
