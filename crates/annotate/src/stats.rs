//! Per-channel pixel statistics over a set of rasters, used to derive
//! dataset normalization constants.

use serde::{Deserialize, Serialize};

use crate::{
    error::{AnnotateError, Result},
    types::SegmentationImage,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelStats {
    pub mean: [f64; 3],
    pub std: [f64; 3],
    pub mean_256: [f64; 3],
    pub std_256: [f64; 3],
    pub pixel_count: u64,
}

impl PixelStats {
    /// Population mean and standard deviation of every pixel of every image.
    pub fn from_images(images: &[SegmentationImage]) -> Result<Self> {
        if images.is_empty() {
            return Err(AnnotateError::InvalidImage(
                "no images to compute statistics over".to_string(),
            ));
        }

        // Welford's running update per channel.
        let mut count = 0u64;
        let mut mean = [0.0f64; 3];
        let mut m2 = [0.0f64; 3];
        for image in images {
            for pixel in image.as_rgb32f().pixels() {
                count += 1;
                for c in 0..3 {
                    let value = pixel.0[c] as f64;
                    let delta = value - mean[c];
                    mean[c] += delta / count as f64;
                    m2[c] += delta * (value - mean[c]);
                }
            }
        }

        let std = m2.map(|m| (m / count as f64).sqrt());
        Ok(Self {
            mean,
            std,
            mean_256: mean.map(|m| m * 256.0),
            std_256: std.map(|s| s * 256.0),
            pixel_count: count,
        })
    }
}
