use std::io::Cursor;
use std::path::Path;

use image::{
    imageops::FilterType, DynamicImage, GenericImageView, ImageError, ImageOutputFormat, RgbaImage,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Failed to decode image: {0}")]
    Load(#[from] ImageError),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Image is empty (0 bytes)")]
    Empty,
}

/// Decode PNG/JPEG/WebP bytes as returned by Figma exports or browser screenshots.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ImageLoadError> {
    if bytes.is_empty() {
        return Err(ImageLoadError::Empty);
    }
    Ok(image::load_from_memory(bytes)?)
}

pub fn load_image(path: &Path) -> Result<DynamicImage, ImageLoadError> {
    if !path.exists() {
        return Err(ImageLoadError::NotFound(path.display().to_string()));
    }
    Ok(image::open(path)?)
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
    Ok(buf)
}

pub fn resize_to_match(img: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    if img.dimensions() == (target_width, target_height) {
        return img.clone();
    }
    img.resize_exact(target_width, target_height, FilterType::Lanczos3)
}
