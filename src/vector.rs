//! Feature vector type

use serde::{Deserialize, Serialize};

/// Number of channels per canonical pixel (R, G, B).
pub const CHANNELS: usize = 3;

/// A fixed-length image fingerprint: interleaved RGB bytes of the
/// canonical-size image, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    data: Vec<u8>,
}

impl FeatureVector {
    /// Create a new vector from raw channel bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Get the dimension (component count) of the vector
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Get the underlying data as a slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Check if this vector has the same dimension as another
    pub fn has_same_dimension(&self, other: &FeatureVector) -> bool {
        self.dimension() == other.dimension()
    }

    /// Number of whole pixels covered by the vector.
    pub fn pixel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    /// Iterate over `[r, g, b]` triples.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(CHANNELS)
    }
}

impl From<Vec<u8>> for FeatureVector {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
