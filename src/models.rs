use image::{ImageFormat, RgbImage};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::InferenceError;

/// Encoded image bytes as handed over by an image source
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Vec<u8>,

    /// Encoding hint (None means the decoder guesses from the content)
    pub format: Option<ImageFormat>,

    /// Where the image came from, for display only
    pub origin: Option<PathBuf>,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>, format: Option<ImageFormat>) -> Self {
        Self {
            bytes,
            format,
            origin: None,
        }
    }

    /// Read an image file; the format hint comes from the extension
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Ok(Self {
            bytes,
            format: ImageFormat::from_path(path).ok(),
            origin: Some(path.to_path_buf()),
        })
    }

    /// Human-readable name of the image (file path or "<memory>")
    pub fn display_name(&self) -> String {
        match &self.origin {
            Some(path) => path.display().to_string(),
            None => "<memory>".to_string(),
        }
    }
}

/// RGB pixels resized to the classifier's input size
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub pixels: RgbImage,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Planar CHW float data, each channel scaled to [0,1] then standardized
    pub fn to_chw(&self, mean: [f32; 3], std: [f32; 3]) -> Vec<f32> {
        let (width, height) = self.pixels.dimensions();
        let plane = width as usize * height as usize;
        let mut data = vec![0.0f32; 3 * plane];

        for (x, y, pixel) in self.pixels.enumerate_pixels() {
            let offset = y as usize * width as usize + x as usize;
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                data[c * plane + offset] = (value - mean[c]) / std[c];
            }
        }

        data
    }
}

/// One ranked entry of a classifier's output
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Non-empty classifier output, ordered by descending confidence
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    entries: Vec<Classification>,
}

impl ClassificationResult {
    /// Wrap classifier output; an empty list is an inference failure
    pub fn new(entries: Vec<Classification>) -> Result<Self, InferenceError> {
        if entries.is_empty() {
            return Err(InferenceError::NoResults);
        }
        Ok(Self { entries })
    }

    /// Highest-ranked entry. Ties are resolved by the classifier's own order.
    pub fn top(&self) -> &Classification {
        &self.entries[0]
    }

    pub fn entries(&self) -> &[Classification] {
        &self.entries
    }
}

/// Final display outcome of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub label: String,
    pub positive: bool,

    /// The classification the decision was based on
    pub basis: Classification,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn empty_result_is_rejected() {
        let err = ClassificationResult::new(vec![]).unwrap_err();
        assert!(matches!(err, InferenceError::NoResults));
    }

    #[test]
    fn top_keeps_classifier_order_on_ties() {
        let result = ClassificationResult::new(vec![
            Classification::new("bun", 0.5),
            Classification::new("hotdog", 0.5),
        ])
        .unwrap();
        assert_eq!(result.top().label, "bun");
        assert_eq!(result.entries().len(), 2);
    }

    #[test]
    fn chw_layout_is_planar() {
        let pixels = RgbImage::from_pixel(2, 2, Rgb([255, 0, 51]));
        let image = NormalizedImage { pixels };
        let data = image.to_chw([0.0; 3], [1.0; 3]);

        assert_eq!(data.len(), 12);
        assert!(data[0..4].iter().all(|v| (*v - 1.0).abs() < 1e-6));
        assert!(data[4..8].iter().all(|v| v.abs() < 1e-6));
        assert!(data[8..12].iter().all(|v| (*v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn chw_plane_covers_non_square_input() {
        let mut pixels = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        pixels.put_pixel(2, 1, Rgb([255, 255, 255]));
        let image = NormalizedImage { pixels };
        let data = image.to_chw([0.0; 3], [1.0; 3]);

        assert_eq!(data.len(), 18);
        // Last pixel of each 6-value plane
        for c in 0..3 {
            assert!((data[c * 6 + 5] - 1.0).abs() < 1e-6);
            assert!(data[c * 6..c * 6 + 5].iter().all(|v| v.abs() < 1e-6));
        }
    }

    #[test]
    fn chw_applies_mean_and_std() {
        let pixels = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        let image = NormalizedImage { pixels };
        let data = image.to_chw([0.5, 0.5, 0.5], [0.5, 0.25, 0.5]);
        assert!((data[0] - 1.0).abs() < 1e-6);
        assert!((data[1] - 2.0).abs() < 1e-6);
    }
}
