//! Catalog operations: rebuild, upsert, remove and match.
//!
//! The index is an explicit value. Mutating operations take the current
//! index by reference, build a new one, persist it, and hand it back; if the
//! persist fails the caller still holds the untouched index.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{MatcherError, Result};
use crate::extractor::{FeatureExtractor, ImageBytes};
use crate::index::ReferenceIndex;
use crate::matcher::{MatchResult, Matcher};
use crate::persistence::storage::IndexStorage;

/// Extension (case-insensitive) of files picked up by a rebuild.
pub const REFERENCE_EXTENSION: &str = "png";

/// Index name for a reference file: the file name minus its last
/// extension, case and spelling untouched. `None` for paths without a
/// UTF-8 file stem.
pub fn reference_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Whether `path` has the reference image extension.
pub fn is_reference_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(REFERENCE_EXTENSION))
}

/// A file left out of a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// What a rebuild did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Names indexed, in the order they were processed.
    pub indexed: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// Qualifying reference files directly inside `dir`, sorted by path.
fn reference_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MatcherError::Precondition(format!(
            "reference directory {} not found",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_reference_image(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Build a brand-new index from every reference image in `dir`.
///
/// Unreadable or undecodable files are skipped and reported. The result
/// replaces any previous index entirely, so an empty result is refused with
/// [`MatcherError::Precondition`] unless `allow_empty` is set.
pub fn build_index(
    extractor: &FeatureExtractor,
    dir: &Path,
    allow_empty: bool,
) -> Result<(ReferenceIndex, RebuildReport)> {
    let files = reference_files(dir)?;
    info!("indexing {} files in {}", files.len(), dir.display());

    let mut index = ReferenceIndex::new(extractor.scheme());
    let mut report = RebuildReport::default();

    for path in files {
        let Some(name) = reference_name(&path) else {
            warn!("skipping {}: file name is not valid UTF-8", path.display());
            report.skipped.push(SkippedFile {
                path,
                reason: "file name is not valid UTF-8".to_string(),
            });
            continue;
        };

        let vector = match extractor.extract_file(&path) {
            Ok(vector) => vector,
            Err(e) if e.is_image_local() => {
                warn!("skipping {}: {e}", path.display());
                report.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        if index.upsert(name.clone(), vector)?.is_some() {
            warn!("{} overrides an earlier file named '{name}'", path.display());
        }
        report.indexed.push(name);
    }

    if index.is_empty() && !allow_empty {
        return Err(MatcherError::Precondition(format!(
            "no indexable images in {}; refusing to replace the index with an empty one",
            dir.display()
        )));
    }

    Ok((index, report))
}

/// One operator action, with its inputs.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Replace the whole index from a reference directory ("Mass Update").
    Rebuild { directory: PathBuf, allow_empty: bool },
    /// Insert or overwrite one entry ("Add Data").
    Upsert { name: String, image: ImageBytes },
    /// Drop one entry ("Remove Data").
    Remove { name: String },
    /// Look a candidate up without touching the index.
    Match { candidate: ImageBytes },
}

/// Result of an [`Operation`]. Mutating outcomes carry the new index.
#[derive(Debug, Clone)]
pub enum Outcome {
    Rebuilt {
        index: ReferenceIndex,
        report: RebuildReport,
    },
    Upserted {
        index: ReferenceIndex,
        name: String,
        replaced: bool,
    },
    Removed {
        index: ReferenceIndex,
        name: String,
    },
    Matched(MatchResult),
}

impl Outcome {
    /// The updated index, for mutating operations.
    pub fn into_index(self) -> Option<ReferenceIndex> {
        match self {
            Outcome::Rebuilt { index, .. }
            | Outcome::Upserted { index, .. }
            | Outcome::Removed { index, .. } => Some(index),
            Outcome::Matched(_) => None,
        }
    }
}

/// Ties an extractor, a matcher and a storage backend together.
#[derive(Debug)]
pub struct Catalog<S: IndexStorage> {
    storage: S,
    extractor: FeatureExtractor,
    matcher: Matcher,
}

impl<S: IndexStorage> Catalog<S> {
    pub fn new(storage: S, extractor: FeatureExtractor, matcher: Matcher) -> Self {
        Self {
            storage,
            extractor,
            matcher,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Load the stored index (empty on first run).
    pub fn load(&self) -> Result<ReferenceIndex> {
        self.storage.load(self.extractor.scheme())
    }

    pub fn persist(&self, index: &ReferenceIndex) -> Result<()> {
        self.storage.persist(index)
    }

    /// Rebuild from `dir` and persist. Destructive: prior entries are gone.
    pub fn rebuild(
        &self,
        dir: impl AsRef<Path>,
        allow_empty: bool,
    ) -> Result<(ReferenceIndex, RebuildReport)> {
        let (index, report) = build_index(&self.extractor, dir.as_ref(), allow_empty)?;
        self.persist(&index)?;
        info!(
            "rebuilt index: {} indexed, {} skipped",
            report.indexed.len(),
            report.skipped.len()
        );
        Ok((index, report))
    }

    /// Insert or overwrite `name` with the fingerprint of `image`, then persist.
    /// Returns the new index and whether an entry was replaced.
    pub fn upsert(
        &self,
        index: &ReferenceIndex,
        name: &str,
        image: &ImageBytes,
    ) -> Result<(ReferenceIndex, bool)> {
        let vector = self.extractor.extract_image(image)?;
        let mut updated = index.clone();
        let replaced = updated.upsert(name, vector)?.is_some();
        self.persist(&updated)?;
        info!("added '{name}' from {}", image.source);
        Ok((updated, replaced))
    }

    /// Remove `name`, then persist.
    pub fn remove(&self, index: &ReferenceIndex, name: &str) -> Result<ReferenceIndex> {
        let mut updated = index.clone();
        updated.remove(name)?;
        self.persist(&updated)?;
        info!("removed '{name}'");
        Ok(updated)
    }

    /// Match a candidate image against `index`.
    pub fn match_image(
        &self,
        index: &ReferenceIndex,
        candidate: &ImageBytes,
    ) -> Result<MatchResult> {
        let vector = self.extractor.extract_image(candidate)?;
        self.matcher.find_match(&vector, index)
    }

    /// Run one operator action against the current index.
    pub fn execute(&self, index: &ReferenceIndex, operation: Operation) -> Result<Outcome> {
        match operation {
            Operation::Rebuild {
                directory,
                allow_empty,
            } => {
                let (index, report) = self.rebuild(&directory, allow_empty)?;
                Ok(Outcome::Rebuilt { index, report })
            }
            Operation::Upsert { name, image } => {
                let (index, replaced) = self.upsert(index, &name, &image)?;
                Ok(Outcome::Upserted {
                    index,
                    name,
                    replaced,
                })
            }
            Operation::Remove { name } => {
                let index = self.remove(index, &name)?;
                Ok(Outcome::Removed { index, name })
            }
            Operation::Match { candidate } => {
                Ok(Outcome::Matched(self.match_image(index, &candidate)?))
            }
        }
    }
}
