//! Similarity metrics between feature vectors.
//!
//! Scores are percentages: `100.0` means identical, `0.0` means nothing in
//! common. Higher is better.

use crate::error::{MatcherError, Result};
use crate::vector::FeatureVector;
use serde::{Deserialize, Serialize};

/// Default per-channel tolerance for [`SimilarityMetric::PixelAgreement`].
pub const DEFAULT_TOLERANCE: u8 = 15;

/// Metrics for measuring how alike two fingerprints are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityMetric {
    /// Share of pixels whose largest channel difference (L-infinity over
    /// R, G, B) stays within `tolerance`.
    PixelAgreement { tolerance: u8 },
    /// `100 * (1 - mean |a - b| / 255)` over all channels.
    MeanAbsolute,
}

impl Default for SimilarityMetric {
    fn default() -> Self {
        SimilarityMetric::PixelAgreement {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl SimilarityMetric {
    /// Compute the similarity between two vectors using this metric
    pub fn score(&self, v1: &FeatureVector, v2: &FeatureVector) -> Result<f32> {
        if !v1.has_same_dimension(v2) {
            return Err(MatcherError::DimensionMismatch {
                expected: v1.dimension(),
                actual: v2.dimension(),
            });
        }
        if v1.dimension() == 0 {
            return Ok(0.0);
        }

        Ok(match self {
            SimilarityMetric::PixelAgreement { tolerance } => {
                pixel_agreement(v1, v2, *tolerance)
            }
            SimilarityMetric::MeanAbsolute => mean_absolute_similarity(v1, v2),
        })
    }
}

/// Largest absolute channel difference between two pixels.
fn max_channel_diff(p1: &[u8], p2: &[u8]) -> u8 {
    p1.iter()
        .zip(p2.iter())
        .map(|(a, b)| a.abs_diff(*b))
        .max()
        .unwrap_or(0)
}

/// Percentage of pixels within `tolerance` on every channel
pub fn pixel_agreement(v1: &FeatureVector, v2: &FeatureVector, tolerance: u8) -> f32 {
    let total = v1.pixel_count();
    if total == 0 {
        return 0.0;
    }
    let mismatched = v1
        .pixels()
        .zip(v2.pixels())
        .filter(|(p1, p2)| max_channel_diff(p1, p2) > tolerance)
        .count();

    100.0 - (mismatched as f32 / total as f32) * 100.0
}

/// Mean absolute channel difference mapped onto a 0-100 similarity
pub fn mean_absolute_similarity(v1: &FeatureVector, v2: &FeatureVector) -> f32 {
    let n = v1.dimension();
    if n == 0 {
        return 0.0;
    }
    let total: u64 = v1
        .as_slice()
        .iter()
        .zip(v2.as_slice().iter())
        .map(|(a, b)| a.abs_diff(*b) as u64)
        .sum();

    let mean = total as f64 / n as f64;
    (100.0 * (1.0 - mean / 255.0)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn v(data: &[u8]) -> FeatureVector {
        FeatureVector::new(data.to_vec())
    }

    #[test]
    fn test_pixel_agreement_identical() {
        let a = v(&[10, 20, 30, 200, 100, 0]);
        assert_relative_eq!(pixel_agreement(&a, &a, 0), 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pixel_agreement_counts_pixels_not_channels() {
        let a = v(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        // Pixel 0: one channel off by 16 -> mismatch. Pixel 1: all channels
        // off by exactly 15 -> agrees. Pixels 2 and 3 identical.
        let b = v(&[16, 0, 0, 15, 15, 15, 0, 0, 0, 0, 0, 0]);
        assert_relative_eq!(pixel_agreement(&a, &b, 15), 75.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pixel_agreement_uses_l_infinity() {
        let a = v(&[100, 100, 100]);
        let b = v(&[90, 110, 255]);
        assert_relative_eq!(pixel_agreement(&a, &b, 15), 0.0, epsilon = 1e-6);
        assert_relative_eq!(pixel_agreement(&a, &b, 155), 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mean_absolute_similarity() {
        let a = v(&[0, 0, 0]);
        let b = v(&[255, 255, 255]);
        assert_relative_eq!(mean_absolute_similarity(&a, &b), 0.0, epsilon = 1e-4);
        assert_relative_eq!(mean_absolute_similarity(&a, &a), 100.0, epsilon = 1e-4);

        let c = v(&[51, 51, 51]);
        assert_relative_eq!(mean_absolute_similarity(&a, &c), 80.0, epsilon = 1e-4);
    }

    #[test]
    fn test_metric_dispatch() {
        let a = v(&[0, 0, 0, 50, 50, 50]);
        let b = v(&[0, 0, 0, 0, 0, 0]);
        let agreement = SimilarityMetric::default().score(&a, &b).unwrap();
        assert_relative_eq!(agreement, 50.0, epsilon = 1e-6);
        let mean = SimilarityMetric::MeanAbsolute.score(&a, &b).unwrap();
        assert!(mean > 80.0 && mean < 100.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = v(&[1, 2, 3]);
        let b = v(&[1, 2, 3, 4, 5, 6]);
        assert!(matches!(
            SimilarityMetric::default().score(&a, &b),
            Err(MatcherError::DimensionMismatch { expected: 3, actual: 6 })
        ));
    }
}
