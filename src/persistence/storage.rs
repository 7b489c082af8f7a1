//! Durable storage for the reference index.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::NamedTempFile;

use crate::error::{MatcherError, Result};
use crate::extractor::SchemeTag;
use crate::index::ReferenceIndex;
use crate::persistence::serialization::{IndexFile, IndexFormat};

/// Load/persist boundary for the index.
///
/// `load` is given the scheme of the running extractor: it is used for the
/// empty first-run index and to refuse files built under a different scheme.
pub trait IndexStorage {
    fn load(&self, scheme: SchemeTag) -> Result<ReferenceIndex>;

    /// Replace the stored index wholesale.
    fn persist(&self, index: &ReferenceIndex) -> Result<()>;
}

/// Convert a decoded file into an index, enforcing the scheme tag.
pub fn index_from_file(file: IndexFile, expected: SchemeTag) -> Result<ReferenceIndex> {
    if file.scheme != expected {
        return Err(MatcherError::SchemeMismatch {
            expected,
            found: file.scheme,
        });
    }
    ReferenceIndex::from_entries(file.scheme, file.entries)
}

/// A single index file on disk, rewritten atomically on every persist.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    format: IndexFormat,
}

impl FileStorage {
    /// Storage at `path`; the encoding follows the file extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = IndexFormat::from_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> IndexFormat {
        self.format
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl IndexStorage for FileStorage {
    fn load(&self, scheme: SchemeTag) -> Result<ReferenceIndex> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("no index at {}, starting empty", self.path.display());
                return Ok(ReferenceIndex::new(scheme));
            }
            Err(e) => return Err(MatcherError::storage(&self.path, e)),
        };

        let file = match self.format.decode(&bytes) {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    "index file {} is corrupted ({e}), starting fresh",
                    self.path.display()
                );
                return Ok(ReferenceIndex::new(scheme));
            }
        };

        match index_from_file(file, scheme) {
            Ok(index) => {
                info!("loaded {} entries from {}", index.len(), self.path.display());
                Ok(index)
            }
            Err(e @ MatcherError::SchemeMismatch { .. }) => Err(e),
            Err(e) => {
                warn!(
                    "index file {} holds invalid entries ({e}), starting fresh",
                    self.path.display()
                );
                Ok(ReferenceIndex::new(scheme))
            }
        }
    }

    fn persist(&self, index: &ReferenceIndex) -> Result<()> {
        let bytes = self.format.encode(&IndexFile::from(index))?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| MatcherError::storage(&dir, e))?;

        // Write next to the target so the final rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| MatcherError::storage(&dir, e))?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| MatcherError::storage(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| MatcherError::storage(&self.path, e.error))?;

        info!("saved {} entries to {}", index.len(), self.path.display());
        Ok(())
    }
}

/// Keeps the index in memory only. Writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: RefCell<Option<ReferenceIndex>>,
    persist_count: Cell<usize>,
    fail_writes: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated storage.
    pub fn with_index(index: ReferenceIndex) -> Self {
        let storage = Self::default();
        *storage.slot.borrow_mut() = Some(index);
        storage
    }

    /// The last persisted index, if any.
    pub fn stored(&self) -> Option<ReferenceIndex> {
        self.slot.borrow().clone()
    }

    /// How many successful persists have happened.
    pub fn persist_count(&self) -> usize {
        self.persist_count.get()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl IndexStorage for MemoryStorage {
    fn load(&self, scheme: SchemeTag) -> Result<ReferenceIndex> {
        match self.slot.borrow().as_ref() {
            None => Ok(ReferenceIndex::new(scheme)),
            Some(index) if index.scheme() != scheme => Err(MatcherError::SchemeMismatch {
                expected: scheme,
                found: index.scheme(),
            }),
            Some(index) => Ok(index.clone()),
        }
    }

    fn persist(&self, index: &ReferenceIndex) -> Result<()> {
        if self.fail_writes.get() {
            return Err(MatcherError::storage("<memory>", "writes disabled"));
        }
        *self.slot.borrow_mut() = Some(index.clone());
        self.persist_count.set(self.persist_count.get() + 1);
        Ok(())
    }
}
