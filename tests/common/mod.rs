#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use watchrun::{
    CommandRunner, ExecutionOutcome, FileSnapshot, LogSink, SnapshotSet, SnapshotSource,
    StopFlag, WatchConfig, WatchLoop,
};

/// Replays a fixed sequence of snapshot sets; repeats the last one forever.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pending: VecDeque<SnapshotSet>,
    last: SnapshotSet,
    pub scans: usize,
}

impl ScriptedSource {
    pub fn new(sets: Vec<SnapshotSet>) -> Self {
        Self {
            pending: sets.into(),
            last: SnapshotSet::new(),
            scans: 0,
        }
    }
}

impl SnapshotSource for ScriptedSource {
    fn scan(&mut self, _roots: &[PathBuf], _recurse: bool) -> SnapshotSet {
        self.scans += 1;
        if let Some(next) = self.pending.pop_front() {
            self.last = next;
        }
        self.last.clone()
    }
}

/// Records every command instead of running it.
#[derive(Debug)]
pub struct RecordingRunner {
    pub commands: Vec<String>,
    outcome: ExecutionOutcome,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::returning(ExecutionOutcome::Success)
    }

    pub fn returning(outcome: ExecutionOutcome) -> Self {
        Self {
            commands: Vec::new(),
            outcome,
        }
    }
}

impl CommandRunner for RecordingRunner {
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>> {
        self.commands.push(command.to_string());
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

pub fn snap(path: &Path, mtime: u64, size: u64) -> FileSnapshot {
    FileSnapshot::new(
        path.to_path_buf(),
        SystemTime::UNIX_EPOCH + Duration::from_secs(mtime),
        size,
    )
}

pub fn set(snaps: Vec<FileSnapshot>) -> SnapshotSet {
    snaps.into_iter().collect()
}

/// Config rooted at `dir` with a short poll interval.
pub fn config_for(dir: &TempDir) -> WatchConfig {
    WatchConfig {
        watch_dirs: vec![dir.path().to_path_buf()],
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

pub fn scripted_loop(
    config: WatchConfig,
    sets: Vec<SnapshotSet>,
) -> WatchLoop<ScriptedSource, RecordingRunner> {
    WatchLoop::new(
        Arc::new(config),
        ScriptedSource::new(sets),
        RecordingRunner::new(),
        StopFlag::new(),
    )
    .with_sink(LogSink::console())
}
