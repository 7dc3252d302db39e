use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{json, Map};

use crate::{
    error::Result,
    types::{Annotation, AnnotationSet},
};

impl Annotation {
    /// One polygon per contour, each a single closed exterior ring.
    pub fn to_geometry(&self) -> Geometry {
        let polygons = self
            .segmentation
            .iter()
            .map(|flat| vec![flat.chunks_exact(2).map(|xy| xy.to_vec()).collect()])
            .collect();
        Geometry::new(Value::MultiPolygon(polygons))
    }
}

impl AnnotationSet {
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let mut features = Vec::with_capacity(self.annotations.len());

        for (i, annotation) in self.annotations.iter().enumerate() {
            let mut properties = Map::new();
            properties.insert("color".to_string(), serde_json::to_value(annotation.color)?);
            properties.insert("area".to_string(), json!(annotation.area));
            properties.insert("bbox".to_string(), serde_json::to_value(annotation.bbox)?);
            properties.insert(
                "contour_count".to_string(),
                json!(annotation.segmentation.len()),
            );

            features.push(Feature {
                bbox: None,
                geometry: Some(annotation.to_geometry()),
                id: Some(geojson::feature::Id::Number(serde_json::Number::from(i))),
                properties: Some(properties),
                foreign_members: None,
            });
        }

        // Image metadata travels in the collection's foreign members.
        let mut foreign_members = Map::new();
        foreign_members.insert("image_width".to_string(), json!(self.image_width));
        foreign_members.insert("image_height".to_string(), json!(self.image_height));
        foreign_members.insert("category_count".to_string(), json!(self.annotations.len()));

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }

    /// Export to GeoJSON and serialize to JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        let geojson = self.to_geojson()?;
        Ok(serde_json::to_string_pretty(&geojson)?)
    }
}
