use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use super::snapshot::{FileSnapshot, SnapshotSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Created,
    Modified,
    Deleted,
}

impl EventKind {
    /// Short verb used in command result log lines.
    pub fn verb(&self) -> &'static str {
        match self {
            EventKind::Created => "create",
            EventKind::Modified => "modify",
            EventKind::Deleted => "delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Created => "created",
            EventKind::Modified => "modified",
            EventKind::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

/// A change to one path between two consecutive snapshot sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: EventKind,
    pub old: FileSnapshot,
    pub new: FileSnapshot,
}

impl FileEvent {
    pub fn new(path: PathBuf, kind: EventKind, old: FileSnapshot, new: FileSnapshot) -> Self {
        Self { path, kind, old, new }
    }
}

/// Diff two snapshot sets into typed events.
///
/// Events come back sorted by path. Files whose modification time and size
/// are both unchanged produce no event even if their content changed.
pub fn classify(previous: &SnapshotSet, current: &SnapshotSet) -> Vec<FileEvent> {
    let all_paths: BTreeSet<&PathBuf> = previous.paths().chain(current.paths()).collect();

    let mut events = Vec::new();
    for path in all_paths {
        let old = previous.get(path).filter(|s| s.exists);
        let new = current.get(path).filter(|s| s.exists);

        let event = match (old, new) {
            (None, Some(new)) => Some(FileEvent::new(
                path.clone(),
                EventKind::Created,
                FileSnapshot::absent(path.clone()),
                new.clone(),
            )),
            (Some(old), None) => Some(FileEvent::new(
                path.clone(),
                EventKind::Deleted,
                old.clone(),
                FileSnapshot::absent(path.clone()),
            )),
            (Some(old), Some(new)) if old.metadata_differs(new) => Some(FileEvent::new(
                path.clone(),
                EventKind::Modified,
                old.clone(),
                new.clone(),
            )),
            _ => None,
        };

        if let Some(event) = event {
            events.push(event);
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    fn snap(path: &str, mtime: u64, size: u64) -> FileSnapshot {
        FileSnapshot::new(
            PathBuf::from(path),
            SystemTime::UNIX_EPOCH + Duration::from_secs(mtime),
            size,
        )
    }

    fn set(snaps: Vec<FileSnapshot>) -> SnapshotSet {
        snaps.into_iter().collect()
    }

    #[test]
    fn test_created_event() {
        let previous = SnapshotSet::new();
        let current = set(vec![snap("/w/a.py", 100, 10)]);

        let events = classify(&previous, &current);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Created);
        assert!(!events[0].old.exists);
        assert!(events[0].new.exists);
    }

    #[test]
    fn test_absent_sentinel_in_previous_counts_as_created() {
        let previous = set(vec![FileSnapshot::absent(PathBuf::from("/w/a.py"))]);
        let current = set(vec![snap("/w/a.py", 100, 10)]);

        let events = classify(&previous, &current);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Created);
    }

    #[test]
    fn test_deleted_event_has_absent_new_snapshot() {
        let previous = set(vec![snap("/w/a.py", 100, 10)]);
        let current = SnapshotSet::new();

        let events = classify(&previous, &current);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Deleted);
        assert!(!events[0].new.exists);
        assert_eq!(events[0].old.size, 10);
    }

    #[test]
    fn test_modified_when_only_mtime_changes() {
        let previous = set(vec![snap("/w/a.py", 100, 10)]);
        let current = set(vec![snap("/w/a.py", 150, 10)]);

        let events = classify(&previous, &current);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Modified);
        assert_eq!(events[0].path, Path::new("/w/a.py"));
    }

    #[test]
    fn test_modified_when_only_size_changes() {
        let previous = set(vec![snap("/w/a.py", 100, 10)]);
        let current = set(vec![snap("/w/a.py", 100, 12)]);

        let events = classify(&previous, &current);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Modified);
    }

    #[test]
    fn test_identical_metadata_produces_no_event() {
        // Content may differ on disk; only metadata is compared.
        let previous = set(vec![snap("/w/a.py", 100, 10)]);
        let current = set(vec![snap("/w/a.py", 100, 10)]);

        assert!(classify(&previous, &current).is_empty());
    }

    #[test]
    fn test_mixed_changes_sorted_by_path() {
        let previous = set(vec![snap("/w/b", 1, 1), snap("/w/c", 1, 1), snap("/w/d", 1, 1)]);
        let current = set(vec![snap("/w/a", 1, 1), snap("/w/c", 2, 1), snap("/w/d", 1, 1)]);

        let events = classify(&previous, &current);
        let summary: Vec<(&Path, EventKind)> =
            events.iter().map(|e| (e.path.as_path(), e.kind)).collect();

        assert_eq!(
            summary,
            vec![
                (Path::new("/w/a"), EventKind::Created),
                (Path::new("/w/b"), EventKind::Deleted),
                (Path::new("/w/c"), EventKind::Modified),
            ]
        );
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(EventKind::Created.to_string(), "created");
        assert_eq!(EventKind::Deleted.verb(), "delete");
    }
}
