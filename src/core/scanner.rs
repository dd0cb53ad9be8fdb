use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use super::snapshot::{FileSnapshot, SnapshotSet};

/// Something that can produce a complete snapshot of the watched roots.
///
/// The watch loop only depends on this trait, so tests can drive it with a
/// scripted sequence of snapshot sets instead of a real directory tree.
pub trait SnapshotSource {
    fn scan(&mut self, roots: &[PathBuf], recurse: bool) -> SnapshotSet;
}

/// Walks directories on disk and records metadata for every regular file.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner;

impl DirectoryScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan a single root into `set`.
    pub fn scan_root(&self, root: &Path, recurse: bool, set: &mut SnapshotSet) {
        // Plain walk: hidden files and ignore files do not hide anything.
        let mut builder = WalkBuilder::new(root);
        builder.standard_filters(false).follow_links(false);
        if !recurse {
            builder.max_depth(Some(1));
        }

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::trace!("Skipping unreadable entry under {}: {}", root.display(), err);
                    continue;
                }
            };

            // Symlinks are resolved by `metadata`, so a link to a regular
            // file is tracked like the file itself.
            let is_candidate = entry
                .file_type()
                .map(|ft| ft.is_file() || ft.is_symlink())
                .unwrap_or(false);
            if !is_candidate {
                continue;
            }

            match FileSnapshot::from_metadata(entry.path()) {
                Ok(snapshot) => set.insert(snapshot),
                Err(err) => tracing::trace!("Excluding from scan: {}", err),
            }
        }
    }
}

impl SnapshotSource for DirectoryScanner {
    fn scan(&mut self, roots: &[PathBuf], recurse: bool) -> SnapshotSet {
        let mut set = SnapshotSet::new();
        for root in roots {
            self.scan_root(root, recurse, &mut set);
        }
        tracing::debug!("Scanned {} roots, {} files", roots.len(), set.len());
        set
    }
}
