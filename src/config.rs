//! Runtime settings shared by the library and the CLI.

use std::path::PathBuf;
use std::time::Duration;

use crate::distance::{SimilarityMetric, DEFAULT_TOLERANCE};
use crate::error::{MatcherError, Result};
use crate::extractor::{ExtractorConfig, DEFAULT_CANONICAL_SIZE, MAX_CANONICAL_SIZE};
use crate::matcher::{MatcherConfig, DEFAULT_THRESHOLD};

pub const DEFAULT_INDEX_FILE: &str = "image_index.json";
pub const DEFAULT_IMAGE_DIR: &str = "images";
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Which similarity metric to score with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricKind {
    #[default]
    PixelAgreement,
    MeanAbsolute,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Durable index file. `.json` is stored as JSON, anything else binary.
    pub index_path: PathBuf,
    /// Directory scanned by a rebuild.
    pub image_dir: PathBuf,
    pub canonical_size: u32,
    /// Per-channel tolerance for pixel agreement.
    pub tolerance: u8,
    /// Minimum score (0-100) for a match.
    pub threshold: f32,
    pub metric: MetricKind,
    pub download_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(DEFAULT_INDEX_FILE),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            canonical_size: DEFAULT_CANONICAL_SIZE,
            tolerance: DEFAULT_TOLERANCE,
            threshold: DEFAULT_THRESHOLD,
            metric: MetricKind::default(),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(MatcherError::Precondition(format!(
                "threshold must be between 0 and 100, got {}",
                self.threshold
            )));
        }
        if !(1..=MAX_CANONICAL_SIZE).contains(&self.canonical_size) {
            return Err(MatcherError::Precondition(format!(
                "canonical size must be between 1 and {MAX_CANONICAL_SIZE}, got {}",
                self.canonical_size
            )));
        }
        Ok(())
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            canonical_size: self.canonical_size,
        }
    }

    pub fn matcher_config(&self) -> MatcherConfig {
        let metric = match self.metric {
            MetricKind::PixelAgreement => SimilarityMetric::PixelAgreement {
                tolerance: self.tolerance,
            },
            MetricKind::MeanAbsolute => SimilarityMetric::MeanAbsolute,
        };
        MatcherConfig {
            metric,
            threshold: self.threshold,
        }
    }
}
