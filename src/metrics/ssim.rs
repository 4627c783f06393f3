//! Mean structural similarity over grayscale windows.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use image_compare::Algorithm;

use crate::image_loader::resize_to_match;
use crate::{LayoutCheckError, Result, Viewport};

/// Side of the SSIM window; smaller rasters are scaled up to one window.
const MIN_SIDE: u32 = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualSimilarityEstimator;

impl PerceptualSimilarityEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Mean SSIM in `[0, 1]` after resizing both images to `target`.
    pub fn mssim(
        &self,
        reference: &DynamicImage,
        capture: &DynamicImage,
        target: Viewport,
    ) -> Result<f64> {
        let reference = resize_to_match(reference, target.width, target.height).to_luma8();
        let capture = resize_to_match(capture, target.width, target.height).to_luma8();
        mean_ssim(&reference, &capture)
    }
}

pub(crate) fn mean_ssim(a: &GrayImage, b: &GrayImage) -> Result<f64> {
    if a.as_raw() == b.as_raw() {
        return Ok(1.0);
    }

    let (a, b) = (at_least_one_window(a), at_least_one_window(b));
    let similarity = image_compare::gray_similarity_structure(&Algorithm::MSSIMSimple, &a, &b)
        .map_err(|e| LayoutCheckError::Comparison(format!("SSIM failed: {e:?}")))?;

    let score = similarity.score;
    if score.is_nan() {
        return Ok(0.0);
    }
    Ok(score.clamp(0.0, 1.0))
}

fn at_least_one_window(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    if w >= MIN_SIDE && h >= MIN_SIDE {
        return img.clone();
    }
    image::imageops::resize(img, w.max(MIN_SIDE), h.max(MIN_SIDE), FilterType::Nearest)
}
