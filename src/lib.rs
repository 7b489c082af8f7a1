//! # refimage
//!
//! Re-identify images against a private catalog of reference PNGs.
//!
//! This library provides:
//! - Feature extraction (canonical 64x64 RGB fingerprints)
//! - A reference index with atomic JSON or binary persistence
//! - Best-match decisioning with a calibrated confidence threshold
//!
//! ## Example
//!
//! ```rust,no_run
//! use refimage::{Catalog, FeatureExtractor, FileStorage, ImageBytes, Matcher};
//!
//! let catalog = Catalog::new(
//!     FileStorage::new("image_index.json"),
//!     FeatureExtractor::default(),
//!     Matcher::default(),
//! );
//!
//! // Mass update from the reference directory
//! let (index, _report) = catalog.rebuild("images", false)?;
//!
//! // Look up a candidate
//! let candidate = ImageBytes::read("candidate.png")?;
//! if let Some(name) = catalog.match_image(&index, &candidate)?.matched_name() {
//!     println!("matched {name}");
//! }
//! # Ok::<(), refimage::MatcherError>(())
//! ```

pub mod acquire;
pub mod catalog;
pub mod config;
pub mod distance;
pub mod error;
pub mod extractor;
pub mod index;
pub mod matcher;
pub mod persistence;
pub mod vector;

pub use catalog::{Catalog, Operation, Outcome, RebuildReport};
pub use distance::SimilarityMetric;
pub use error::{MatcherError, Result};
pub use extractor::{FeatureExtractor, ImageBytes, SchemeTag};
pub use index::ReferenceIndex;
pub use matcher::{MatchResult, Matcher, MatcherConfig};
pub use persistence::storage::{FileStorage, IndexStorage, MemoryStorage};
pub use vector::FeatureVector;
