//! Uncompressed column-major run-length encoding of binary masks.
//!
//! `counts` alternates background and foreground run lengths and always
//! starts with a background run, which is zero-length when the first pixel
//! in column-major order is foreground.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::error::{AnnotateError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationRle {
    pub counts: Vec<u32>,
    /// `[height, width]`
    pub size: [u32; 2],
}

impl SegmentationRle {
    /// Encode a mask where any non-zero pixel is foreground.
    pub fn encode(mask: &GrayImage) -> Self {
        let (width, height) = mask.dimensions();
        let mut counts = Vec::new();
        let mut current = false;
        let mut run = 0u32;

        for x in 0..width {
            for y in 0..height {
                let value = mask.get_pixel(x, y)[0] != 0;
                if value != current {
                    counts.push(run);
                    run = 0;
                    current = value;
                }
                run += 1;
            }
        }
        counts.push(run);

        Self {
            counts,
            size: [height, width],
        }
    }

    pub fn height(&self) -> u32 {
        self.size[0]
    }

    pub fn width(&self) -> u32 {
        self.size[1]
    }

    /// Rebuild the mask as 0/255 luma.
    pub fn decode(&self) -> Result<GrayImage> {
        let [height, width] = self.size;
        let total = height as u64 * width as u64;
        let sum: u64 = self.counts.iter().map(|&c| c as u64).sum();
        if sum != total {
            return Err(AnnotateError::InvalidRle(format!(
                "runs cover {sum} pixels, mask has {total}"
            )));
        }

        let mut mask = GrayImage::new(width, height);
        let mut index = 0u64;
        for (i, &count) in self.counts.iter().enumerate() {
            if i % 2 == 1 {
                for offset in index..index + count as u64 {
                    let x = (offset / height as u64) as u32;
                    let y = (offset % height as u64) as u32;
                    mask.put_pixel(x, y, Luma([255u8]));
                }
            }
            index += count as u64;
        }
        Ok(mask)
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.counts
            .iter()
            .skip(1)
            .step_by(2)
            .map(|&c| c as u64)
            .sum()
    }
}
