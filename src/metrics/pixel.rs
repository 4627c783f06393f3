//! Pixel-level diffing with pixelmatch (YIQ colour metric plus
//! anti-aliasing detection).

use std::io::Cursor;

use image::{Rgba, RgbaImage};
use pixelmatch::{pixelmatch, Options};

use crate::image_loader::{decode_image, encode_png};
use crate::{LayoutCheckError, Result};

/// Maximum possible squared YIQ delta between two colours.
pub const MAX_YIQ_DELTA: f64 = 35215.0;

pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Colour used for mismatched pixels in the diff raster.
pub const DIFF_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Colour used for matching pixels (fully transparent).
pub const NEUTRAL_COLOR: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, Copy)]
pub struct PixelDiffEngine {
    /// Matching threshold (0 to 1); smaller is more sensitive.
    pub threshold: f64,
}

impl Default for PixelDiffEngine {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PixelDiff {
    pub diff_count: u64,
    pub total_pixels: u64,
    pub diff_ratio: f64,
    /// Same size as the inputs; mismatches in [`DIFF_COLOR`], the rest [`NEUTRAL_COLOR`].
    pub diff_image: RgbaImage,
}

impl PixelDiff {
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        Ok(encode_png(&self.diff_image)?)
    }
}

impl PixelDiffEngine {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Pixels whose YIQ delta exceeds `MAX_YIQ_DELTA * threshold²` count as
    /// mismatches, except those pixelmatch classifies as anti-aliasing.
    pub fn compare(&self, reference: &RgbaImage, capture: &RgbaImage) -> Result<PixelDiff> {
        if reference.dimensions() != capture.dimensions() {
            return Err(LayoutCheckError::DimensionMismatch {
                reference_width: reference.width(),
                reference_height: reference.height(),
                capture_width: capture.width(),
                capture_height: capture.height(),
            });
        }

        let (width, height) = reference.dimensions();
        let total_pixels = width as u64 * height as u64;

        // Empty and byte-identical rasters have nothing to mark.
        if total_pixels == 0 || reference.as_raw() == capture.as_raw() {
            return Ok(PixelDiff {
                diff_count: 0,
                total_pixels,
                diff_ratio: 0.0,
                diff_image: RgbaImage::from_pixel(width, height, NEUTRAL_COLOR),
            });
        }

        let reference_png = encode_png(reference)?;
        let capture_png = encode_png(capture)?;
        let mut output = Vec::new();
        let count = pixelmatch(
            Cursor::new(reference_png),
            Cursor::new(capture_png),
            Some(&mut output),
            Some(width),
            Some(height),
            Some(Options {
                threshold: self.threshold,
                diff_color: DIFF_COLOR.0,
                diff_mask: true,
                ..Default::default()
            }),
        )
        .map_err(|e| LayoutCheckError::Comparison(format!("pixelmatch failed: {e:?}")))?;

        let marked = decode_image(&output)
            .map_err(|e| LayoutCheckError::Comparison(format!("pixelmatch output: {e}")))?
            .to_rgba8();
        let diff_image = RgbaImage::from_fn(width, height, |x, y| {
            if *marked.get_pixel(x, y) == DIFF_COLOR {
                DIFF_COLOR
            } else {
                NEUTRAL_COLOR
            }
        });

        let diff_count = count as u64;
        Ok(PixelDiff {
            diff_count,
            total_pixels,
            diff_ratio: diff_count as f64 / total_pixels as f64,
            diff_image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::decode_image;

    fn solid(w: u32, h: u32, c: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(c))
    }

    #[test]
    fn identical_images_have_no_diff() {
        let a = solid(8, 6, [30, 60, 90, 255]);
        let diff = PixelDiffEngine::default().compare(&a, &a.clone()).unwrap();
        assert_eq!(diff.diff_count, 0);
        assert_eq!(diff.diff_ratio, 0.0);
        assert!(diff.diff_image.pixels().all(|p| *p == NEUTRAL_COLOR));
    }

    #[test]
    fn fully_different_images_mark_every_pixel() {
        let a = solid(5, 4, [0, 0, 0, 255]);
        let b = solid(5, 4, [255, 255, 255, 255]);
        let diff = PixelDiffEngine::default().compare(&a, &b).unwrap();
        assert_eq!(diff.diff_count, 20);
        assert_eq!(diff.total_pixels, 20);
        assert!((diff.diff_ratio - 1.0).abs() < f64::EPSILON);
        assert!(diff.diff_image.pixels().all(|p| *p == DIFF_COLOR));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let a = solid(800, 600, [0, 0, 0, 255]);
        let b = solid(800, 400, [0, 0, 0, 255]);
        let err = PixelDiffEngine::default().compare(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            LayoutCheckError::DimensionMismatch {
                reference_height: 600,
                capture_height: 400,
                ..
            }
        ));
    }

    #[test]
    fn small_differences_stay_below_threshold() {
        let a = solid(4, 4, [100, 100, 100, 255]);
        let b = solid(4, 4, [102, 101, 100, 255]);
        let diff = PixelDiffEngine::default().compare(&a, &b).unwrap();
        assert_eq!(diff.diff_count, 0);

        let strict = PixelDiffEngine::new(0.0).compare(&a, &b).unwrap();
        assert_eq!(strict.diff_count, 16);
    }

    #[test]
    fn diff_ratio_is_monotonic_as_threshold_decreases() {
        let mut a = RgbaImage::new(16, 16);
        let mut b = RgbaImage::new(16, 16);
        for (x, y, px) in a.enumerate_pixels_mut() {
            *px = Rgba([(x * 16) as u8, (y * 16) as u8, 128, 255]);
        }
        for (x, y, px) in b.enumerate_pixels_mut() {
            let shift = ((x + y) * 3) as u8;
            let red = (x * 16) as u8 ^ shift;
            *px = Rgba([red, (y * 16) as u8, 128u8.wrapping_add(shift), 255]);
        }

        let mut previous = -1.0;
        for threshold in [1.0, 0.5, 0.3, 0.2, 0.1, 0.05, 0.01, 0.0] {
            let ratio = PixelDiffEngine::new(threshold)
                .compare(&a, &b)
                .unwrap()
                .diff_ratio;
            assert!(
                ratio >= previous,
                "ratio {ratio} at threshold {threshold} dropped below {previous}"
            );
            previous = ratio;
        }
    }

    #[test]
    fn compare_is_deterministic() {
        let a = solid(10, 10, [10, 200, 30, 255]);
        let mut b = a.clone();
        b.put_pixel(3, 7, Rgba([250, 0, 0, 255]));
        let engine = PixelDiffEngine::default();
        let first = engine.compare(&a, &b).unwrap();
        let second = engine.compare(&a, &b).unwrap();
        assert_eq!(first.diff_count, 1);
        assert_eq!(first.diff_image, second.diff_image);
        assert_eq!(first.encode_png().unwrap(), second.encode_png().unwrap());
    }

    #[test]
    fn encoded_diff_keeps_mismatch_positions() {
        let a = solid(12, 9, [240, 240, 240, 255]);
        let mut b = a.clone();
        let marked = [(0, 0), (5, 4), (11, 8)];
        for (x, y) in marked {
            b.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }

        let diff = PixelDiffEngine::default().compare(&a, &b).unwrap();
        let decoded = decode_image(&diff.encode_png().unwrap()).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (12, 9));
        for (x, y, px) in decoded.enumerate_pixels() {
            let expected = if marked.contains(&(x, y)) {
                DIFF_COLOR
            } else {
                NEUTRAL_COLOR
            };
            assert_eq!(*px, expected, "pixel ({x},{y})");
        }
    }

    #[test]
    fn transparent_pixels_blend_over_white() {
        let a = solid(2, 2, [0, 0, 0, 0]);
        let b = solid(2, 2, [255, 255, 255, 255]);
        let diff = PixelDiffEngine::default().compare(&a, &b).unwrap();
        assert_eq!(diff.diff_count, 0);
    }

    #[test]
    fn anti_aliased_edge_is_not_counted() {
        let mut a = solid(20, 20, [255, 255, 255, 255]);
        for y in 5..15 {
            for x in 5..15 {
                a.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let mut b = a.clone();
        for y in 5..15 {
            b.put_pixel(15, y, Rgba([128, 128, 128, 255]));
        }

        let diff = PixelDiffEngine::new(0.1).compare(&a, &b).unwrap();
        assert_eq!(diff.diff_count, 0);
        assert!(diff.diff_image.pixels().all(|p| *p == NEUTRAL_COLOR));
    }
}
