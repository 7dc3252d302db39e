use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Over {max} categories: {found}")]
    CategoryLimitExceeded { found: usize, max: usize },

    #[error("Invalid segmentation image: {0}")]
    InvalidImage(String),

    #[error("Invalid extraction config: {0}")]
    InvalidConfig(String),

    #[error("Invalid run-length encoding: {0}")]
    InvalidRle(String),

    #[error("Geometric computation error: {0}")]
    GeometricComputation(String),

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

impl AnnotateError {
    /// Errors that abort the whole image rather than a single category.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CategoryLimitExceeded { .. } | Self::InvalidImage(_) | Self::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
