//! Feature extraction: PNG bytes to a fixed-length fingerprint.
//!
//! Every image is converted to 8-bit RGB and resampled to a square canonical
//! grid with a Lanczos3 filter, then flattened row-major into interleaved
//! channel bytes. The canonical grid neutralises the source resolution, so two
//! renditions of the same picture at different sizes land on nearly the same
//! vector.

use std::fmt;
use std::fs;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::{MatcherError, Result};
use crate::vector::{FeatureVector, CHANNELS};

/// Bumped whenever the transform changes in a way that makes old vectors
/// incomparable with new ones.
pub const SCHEME_VERSION: u32 = 1;

/// Default side length of the canonical grid.
pub const DEFAULT_CANONICAL_SIZE: u32 = 64;

/// Largest accepted canonical side length.
pub const MAX_CANONICAL_SIZE: u32 = 1024;

/// Identifies the extraction method that produced a set of vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeTag {
    pub version: u32,
    pub canonical_size: u32,
}

impl SchemeTag {
    /// Vector length produced under this scheme. Saturates for sizes no
    /// extractor accepts, so such a tag matches no stored vector.
    pub fn dimension(&self) -> usize {
        let side = self.canonical_size as usize;
        side.checked_mul(side)
            .and_then(|px| px.checked_mul(CHANNELS))
            .unwrap_or(usize::MAX)
    }
}

impl fmt::Display for SchemeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{}/{}x{}",
            self.version, self.canonical_size, self.canonical_size
        )
    }
}

/// Configuration for the feature extractor.
#[derive(Debug, Clone, Copy)]
pub struct ExtractorConfig {
    /// Side length of the square grid every image is resampled to.
    pub canonical_size: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            canonical_size: DEFAULT_CANONICAL_SIZE,
        }
    }
}

/// Reduces images to [`FeatureVector`]s. Stateless apart from its config.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    config: ExtractorConfig,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            config: ExtractorConfig::default(),
        }
    }
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        if !(1..=MAX_CANONICAL_SIZE).contains(&config.canonical_size) {
            return Err(MatcherError::Precondition(format!(
                "canonical size must be between 1 and {MAX_CANONICAL_SIZE}, got {}",
                config.canonical_size
            )));
        }
        Ok(Self { config })
    }

    /// The scheme tag stamped on every index built by this extractor.
    pub fn scheme(&self) -> SchemeTag {
        SchemeTag {
            version: SCHEME_VERSION,
            canonical_size: self.config.canonical_size,
        }
    }

    /// Vector length `L` produced by this extractor.
    pub fn dimension(&self) -> usize {
        self.scheme().dimension()
    }

    /// Extract a vector from an already decoded image.
    pub fn extract(&self, image: &DynamicImage) -> FeatureVector {
        let size = self.config.canonical_size;
        let rgb = image.to_rgb8();
        let canonical = imageops::resize(&rgb, size, size, FilterType::Lanczos3);
        FeatureVector::new(canonical.into_raw())
    }

    /// Decode PNG bytes and extract. `source_name` labels the input in errors.
    pub fn extract_bytes(&self, bytes: &[u8], source_name: &str) -> Result<FeatureVector> {
        let image = decode_png(bytes, source_name)?;
        Ok(self.extract(&image))
    }

    pub fn extract_image(&self, image: &ImageBytes) -> Result<FeatureVector> {
        self.extract_bytes(&image.bytes, &image.source)
    }

    /// Read a PNG file from disk and extract.
    pub fn extract_file(&self, path: impl AsRef<Path>) -> Result<FeatureVector> {
        self.extract_image(&ImageBytes::read(path)?)
    }
}

/// Raw, still-encoded image bytes plus a label for error messages
/// (a file path or URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes {
    pub source: String,
    pub bytes: Vec<u8>,
}

impl ImageBytes {
    pub fn new(source: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            bytes,
        }
    }

    /// Read a local file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| MatcherError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.display().to_string(), bytes))
    }
}

/// Decode bytes strictly as PNG; other formats are rejected.
pub fn decode_png(bytes: &[u8], source_name: &str) -> Result<DynamicImage> {
    image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| MatcherError::decode(source_name, e))
}

#[cfg(test)]
pub(crate) mod test_images {
    //! Synthetic PNG fixtures shared by unit tests.

    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// Smooth warm gradient; stands in for a photo of a cat.
    pub fn cat(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let fx = x as f32 / width as f32;
            let fy = y as f32 / height as f32;
            Rgb([
                (40.0 + 200.0 * fx) as u8,
                (30.0 + 120.0 * fy) as u8,
                (20.0 + 40.0 * fx * fy) as u8,
            ])
        })
    }

    /// Cool radial pattern, far from [`cat`] everywhere.
    pub fn dog(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let dx = x as f32 / width as f32 - 0.5;
            let dy = y as f32 / height as f32 - 0.5;
            let r = (dx * dx + dy * dy).sqrt().min(0.75) / 0.75;
            Rgb([
                (220.0 - 60.0 * r) as u8,
                (230.0 - 40.0 * r) as u8,
                (120.0 + 130.0 * r) as u8,
            ])
        })
    }

    pub fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }
}
