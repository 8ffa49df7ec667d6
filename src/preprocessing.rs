use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use serde::Deserialize;
use std::io::Cursor;

use crate::error::ConversionError;
use crate::models::{NormalizedImage, RawImage};

/// How a decoded image is fitted to the classifier's input size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Resize to the exact target size, ignoring aspect ratio
    #[default]
    Stretch,
    /// Keep aspect ratio and pad the rest with black
    Letterbox,
}

/// Decode raw bytes, using the format hint when there is one
pub fn decode(raw: &RawImage) -> Result<DynamicImage, ConversionError> {
    if raw.bytes.is_empty() {
        return Err(ConversionError::Empty);
    }

    let image = match raw.format {
        Some(format) => image::load_from_memory_with_format(&raw.bytes, format)?,
        None => ImageReader::new(Cursor::new(&raw.bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .decode()?,
    };

    Ok(image)
}

/// Convert to RGB8 and fit to `width` x `height`
pub fn normalize(
    image: &DynamicImage,
    width: u32,
    height: u32,
    mode: ResizeMode,
) -> Result<NormalizedImage, ConversionError> {
    if width == 0 || height == 0 {
        return Err(ConversionError::InvalidTargetSize(width, height));
    }

    let pixels = match mode {
        ResizeMode::Stretch => image
            .resize_exact(width, height, image::imageops::FilterType::Triangle)
            .to_rgb8(),
        ResizeMode::Letterbox => letterbox(image, width, height),
    };

    Ok(NormalizedImage { pixels })
}

fn letterbox(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = (image.width() as f32, image.height() as f32);
    let scale = (width as f32 / src_w).min(height as f32 / src_h);
    let scaled_w = ((src_w * scale) as u32).clamp(1, width);
    let scaled_h = ((src_h * scale) as u32).clamp(1, height);

    let scaled = image
        .resize_exact(scaled_w, scaled_h, image::imageops::FilterType::Triangle)
        .to_rgb8();

    // Center the scaled image on a black canvas
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([0u8, 0, 0]));
    let offset_x = (width - scaled_w) / 2;
    let offset_y = (height - scaled_h) / 2;
    image::imageops::overlay(&mut canvas, &scaled, offset_x.into(), offset_y.into());

    canvas
}
