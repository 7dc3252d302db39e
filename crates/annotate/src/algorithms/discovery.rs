use std::collections::BTreeSet;

use image::{GrayImage, Luma};

use crate::{
    error::{AnnotateError, Result},
    types::{CategoryColor, SegmentationImage},
};

/// Distinct colors of the image in ascending order, background included.
///
/// Fails when more than `max_categories` distinct colors are present.
pub fn discover_categories(
    image: &SegmentationImage,
    max_categories: usize,
) -> Result<Vec<CategoryColor>> {
    let palette: BTreeSet<CategoryColor> = image.colors().collect();
    if palette.len() > max_categories {
        return Err(AnnotateError::CategoryLimitExceeded {
            found: palette.len(),
            max: max_categories,
        });
    }
    Ok(palette.into_iter().collect())
}

/// Binary mask (0/255) of the pixels exactly equal to `color`.
pub fn isolate_category(image: &SegmentationImage, color: CategoryColor) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.color_at(x, y) == color {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
