use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Observable state of one file at one scan instant.
///
/// A snapshot with `exists == false` is the "observed absent" sentinel. Its
/// `modified` and `size` fields carry no meaning and are never compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
    pub exists: bool,
}

impl FileSnapshot {
    pub fn new(path: PathBuf, modified: SystemTime, size: u64) -> Self {
        Self {
            path,
            modified,
            size,
            exists: true,
        }
    }

    pub fn absent(path: PathBuf) -> Self {
        Self {
            path,
            modified: SystemTime::UNIX_EPOCH,
            size: 0,
            exists: false,
        }
    }

    /// Read metadata for `path`. Directories and other non-regular files
    /// are reported as `NotAFile`.
    pub fn from_metadata(path: &Path) -> Result<Self, ScanError> {
        let metadata = std::fs::metadata(path).map_err(|source| ScanError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;

        if !metadata.is_file() {
            return Err(ScanError::NotAFile(path.to_path_buf()));
        }

        let modified = metadata.modified().map_err(|source| ScanError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::new(path.to_path_buf(), modified, metadata.len()))
    }

    /// Whether two snapshots of the same path describe different metadata.
    ///
    /// Only meaningful when both exist; callers classify existence first.
    pub fn metadata_differs(&self, other: &FileSnapshot) -> bool {
        self.modified != other.modified || self.size != other.size
    }
}

/// Why a single file was left out of a scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("cannot read metadata for {path:?}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a regular file: {0:?}")]
    NotAFile(PathBuf),
}

/// All snapshots taken during one scan, keyed by absolute path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSet {
    files: BTreeMap<PathBuf, FileSnapshot>,
}

impl SnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snapshot unless its path is already present.
    ///
    /// The first root that reports a path wins.
    pub fn insert(&mut self, snapshot: FileSnapshot) {
        self.files
            .entry(snapshot.path.clone())
            .or_insert(snapshot);
    }

    pub fn get(&self, path: &Path) -> Option<&FileSnapshot> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.keys()
    }
}

impl FromIterator<FileSnapshot> for SnapshotSet {
    fn from_iter<I: IntoIterator<Item = FileSnapshot>>(iter: I) -> Self {
        let mut set = SnapshotSet::new();
        for snapshot in iter {
            set.insert(snapshot);
        }
        set
    }
}
