//! Core change detection
//!
//! Contains snapshotting, scanning, classification and path filtering

pub mod events;
pub mod filter;
pub mod scanner;
pub mod snapshot;

// Re-export main types
pub use events::{classify, EventKind, FileEvent};
pub use filter::PatternFilter;
pub use scanner::{DirectoryScanner, SnapshotSource};
pub use snapshot::{FileSnapshot, ScanError, SnapshotSet};
