//! Image comparison metrics.
//!
//! - Pixel diff in YIQ space, producing a red-on-transparent diff raster
//! - Mean SSIM over grayscale windows

mod pixel;
mod ssim;

use image::{DynamicImage, GenericImageView};

pub use pixel::{
    PixelDiff, PixelDiffEngine, DEFAULT_THRESHOLD, DIFF_COLOR, MAX_YIQ_DELTA, NEUTRAL_COLOR,
};
pub use ssim::PerceptualSimilarityEstimator;

use crate::{LayoutCheckError, Result, Viewport};

/// Pixel and perceptual results for one reference/capture pair.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub viewport: Viewport,
    pub diff_count: u64,
    pub diff_ratio: f64,
    /// PNG encoding of the diff raster.
    pub diff_png: Vec<u8>,
    pub mssim: f64,
}

impl ComparisonResult {
    pub fn match_ratio(&self) -> f64 {
        1.0 - self.diff_ratio
    }
}

/// Fails with `DimensionMismatch` unless both images have the same size.
pub fn ensure_same_dimensions(
    reference: &DynamicImage,
    capture: &DynamicImage,
) -> Result<Viewport> {
    let (rw, rh) = reference.dimensions();
    let (cw, ch) = capture.dimensions();
    if (rw, rh) != (cw, ch) {
        return Err(LayoutCheckError::DimensionMismatch {
            reference_width: rw,
            reference_height: rh,
            capture_width: cw,
            capture_height: ch,
        });
    }
    Ok(Viewport {
        width: rw,
        height: rh,
    })
}

/// Pixel diff plus SSIM. CPU-bound; async callers should use `spawn_blocking`.
pub fn compare_images(
    reference: &DynamicImage,
    capture: &DynamicImage,
    threshold: f64,
) -> Result<ComparisonResult> {
    let viewport = ensure_same_dimensions(reference, capture)?;

    let diff = PixelDiffEngine::new(threshold).compare(&reference.to_rgba8(), &capture.to_rgba8())?;
    let diff_png = diff.encode_png()?;
    let mssim = PerceptualSimilarityEstimator::new().mssim(reference, capture, viewport)?;

    Ok(ComparisonResult {
        viewport,
        diff_count: diff.diff_count,
        diff_ratio: diff.diff_ratio,
        diff_png,
        mssim,
    })
}
