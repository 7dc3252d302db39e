use std::collections::HashSet;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::{config::StructuringElement, error::Result, traits::MaskPreprocessor};

/// Binary opening to remove salt noise, optionally followed by a closing
#[derive(Debug, Clone)]
pub struct MorphologicalCleanup {
    pub close_after_open: bool,
    pub element: StructuringElement,
}

impl Default for MorphologicalCleanup {
    fn default() -> Self {
        Self {
            close_after_open: true,
            element: StructuringElement::Square,
        }
    }
}

impl MaskPreprocessor for MorphologicalCleanup {
    fn preprocess(&self, mask: &GrayImage) -> Result<GrayImage> {
        let norm = self.element.norm();
        let opened = imageproc::morphology::open(mask, norm, 1);
        if self.close_after_open {
            Ok(imageproc::morphology::close(&opened, norm, 1))
        } else {
            Ok(opened)
        }
    }
}

/// Surrounds the mask with a background frame so every region is enclosed
#[derive(Debug, Clone)]
pub struct BorderPadding {
    pub width: u32,
}

impl Default for BorderPadding {
    fn default() -> Self {
        Self { width: 1 }
    }
}

impl BorderPadding {
    /// Remove a frame previously added by [`BorderPadding`].
    pub fn crop(&self, padded: &GrayImage) -> GrayImage {
        let (w, h) = padded.dimensions();
        let pad = self.width;
        image::imageops::crop_imm(
            padded,
            pad,
            pad,
            w.saturating_sub(2 * pad),
            h.saturating_sub(2 * pad),
        )
        .to_image()
    }
}

impl MaskPreprocessor for BorderPadding {
    fn preprocess(&self, mask: &GrayImage) -> Result<GrayImage> {
        let pad = self.width;
        let mut padded = GrayImage::new(mask.width() + 2 * pad, mask.height() + 2 * pad);
        image::imageops::replace(&mut padded, mask, pad as i64, pad as i64);
        Ok(padded)
    }
}

/// Fills background components that do not reach the image border
#[derive(Debug, Clone, Default)]
pub struct HoleFilling;

impl MaskPreprocessor for HoleFilling {
    fn preprocess(&self, mask: &GrayImage) -> Result<GrayImage> {
        let (width, height) = mask.dimensions();
        if width == 0 || height == 0 {
            return Ok(mask.clone());
        }

        // Label background components; foreground pixels get label 0.
        let labels = connected_components(mask, Connectivity::Four, Luma([255u8]));

        let mut outside = HashSet::new();
        for x in 0..width {
            outside.insert(labels.get_pixel(x, 0)[0]);
            outside.insert(labels.get_pixel(x, height - 1)[0]);
        }
        for y in 0..height {
            outside.insert(labels.get_pixel(0, y)[0]);
            outside.insert(labels.get_pixel(width - 1, y)[0]);
        }

        Ok(GrayImage::from_fn(width, height, |x, y| {
            let label = labels.get_pixel(x, y)[0];
            if mask.get_pixel(x, y)[0] != 0 || !outside.contains(&label) {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        }))
    }
}
