//! Content fingerprints for change detection.
//!
//! A fingerprint pairs the cheap metadata of a file (size, mtime) with a
//! SHA-256 of its bytes. Validation compares metadata first and only hashes
//! when the metadata still matches, so a touched-but-identical file is
//! reported as changed while an untouched one costs a single `stat`.

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Last known good state of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the contents
    pub hash: String,
    pub size: u64,
    pub modified: SystemTime,
    /// Import identifiers seen when the fingerprint was taken
    pub dependencies: Vec<String>,
}

impl Fingerprint {
    /// Stat and hash `path`.
    pub fn capture(path: &Path, dependencies: Vec<String>) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let hash = hash_file(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            hash,
            size: metadata.len(),
            modified: metadata.modified()?,
            dependencies,
        })
    }
}

/// Thread-safe map from path to its last recorded fingerprint.
#[derive(Default)]
pub struct FingerprintStore {
    entries: RwLock<HashMap<PathBuf, Fingerprint>>,
}

impl FingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` is unchanged since its last fingerprint.
    ///
    /// No fingerprint means not valid. A file that cannot be read returns
    /// the IO error; the caller decides how to treat it.
    pub fn is_valid(&self, path: &Path) -> io::Result<bool> {
        let Some((size, modified, hash)) = self
            .entries
            .read()
            .get(path)
            .map(|fp| (fp.size, fp.modified, fp.hash.clone()))
        else {
            return Ok(false);
        };

        let metadata = std::fs::metadata(path)?;
        if metadata.len() != size || metadata.modified()? != modified {
            return Ok(false);
        }

        Ok(hash_file(path)? == hash)
    }

    /// Record the current state of `path`, replacing any previous entry.
    pub fn update(&self, path: &Path, dependencies: Vec<String>) -> io::Result<()> {
        self.insert(Fingerprint::capture(path, dependencies)?);
        Ok(())
    }

    /// Store a fingerprint captured earlier, replacing any previous entry.
    pub fn insert(&self, fingerprint: Fingerprint) {
        self.entries
            .write()
            .insert(fingerprint.path.clone(), fingerprint);
    }

    /// Drop the entry for `path`. Returns whether one existed.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries.write().remove(path).is_some()
    }

    /// Copy of the entry for `path`.
    pub fn get(&self, path: &Path) -> Option<Fingerprint> {
        self.entries.read().get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.read().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Streamed SHA-256 of a file, as lowercase hex.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
