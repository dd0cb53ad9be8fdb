use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigError, WatchConfig};
use crate::core::{classify, EventKind, FileEvent, PatternFilter, SnapshotSet, SnapshotSource};
use crate::dispatch::{DebounceDecision, Debouncer};
use crate::exec::{resolve_command, CommandRunner, ExecutionOutcome};
use crate::logging::LogSink;

/// Longest stretch the poll sleep goes without looking at the stop flag.
const STOP_CHECK_SLICE: Duration = Duration::from_millis(100);

/// Cooperative cancellation shared between the signal handler and the loop.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("no valid directories to watch")]
    NoValidRoots,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WatchError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    Stopped,
}

/// What happened to one classified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Filtered,
    NoCommand,
    Debounced,
    Executed(ExecutionOutcome),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub events: usize,
    pub filtered: usize,
    pub debounced: usize,
    pub executed: usize,
}

/// Polls the watch roots and dispatches commands for changes.
///
/// Everything runs sequentially: a dispatched command is awaited before the
/// next event is looked at, and the next poll waits for the whole cycle.
pub struct WatchLoop<S, R> {
    config: Arc<WatchConfig>,
    source: S,
    runner: R,
    filter: PatternFilter,
    debouncer: Debouncer,
    sink: LogSink,
    stop: StopFlag,
    state: LoopState,
    roots: Vec<PathBuf>,
    current: SnapshotSet,
    scans: u64,
    torn_down: bool,
}

impl<S: SnapshotSource, R: CommandRunner> WatchLoop<S, R> {
    pub fn new(config: Arc<WatchConfig>, source: S, runner: R, stop: StopFlag) -> Self {
        let filter = PatternFilter::from_config(&config);
        let debouncer = Debouncer::new(config.debounce);
        let sink = LogSink::from_config(&config);

        Self {
            config,
            source,
            runner,
            filter,
            debouncer,
            sink,
            stop,
            state: LoopState::Starting,
            roots: Vec::new(),
            current: SnapshotSet::new(),
            scans: 0,
            torn_down: false,
        }
    }

    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn current(&self) -> &SnapshotSet {
        &self.current
    }

    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Start, then poll until stopped. Teardown always runs.
    pub async fn run(&mut self) -> Result<(), WatchError> {
        if let Err(err) = self.start().await {
            self.teardown();
            return Err(err);
        }

        while !self.stop.is_set() {
            self.sleep_or_stop(self.config.poll_interval).await;
            if self.stop.is_set() {
                break;
            }
            self.run_cycle().await;
        }

        self.teardown();
        Ok(())
    }

    /// Resolve roots, take the baseline scan and do the initial run.
    pub async fn start(&mut self) -> Result<(), WatchError> {
        self.roots = self.resolve_roots();
        if self.roots.is_empty() {
            self.sink.log("No valid directories to watch");
            self.state = LoopState::Stopped;
            return Err(WatchError::NoValidRoots);
        }

        self.sink.log("Scanning initial state...");
        self.current = self.scan();
        self.sink.log(format!("Found {} files", self.current.len()));

        if self.config.on_move.is_some() {
            self.sink
                .log("on_move is not used: moves are reported as a delete and a create");
        }

        if self.config.initial_run {
            if let Some(command) = self.config.commands.default.clone() {
                self.sink.log(format!("Initial run: {}", command));
                let outcome = self.runner.run(&command).await;
                self.sink.log(outcome.describe("initial run"));
            }
        }

        self.log_settings();
        self.state = LoopState::Running;
        Ok(())
    }

    /// One scan, classify, filter and dispatch pass. The candidate snapshot
    /// becomes current only once every event has been handled.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let candidate = self.scan();
        let events = classify(&self.current, &candidate);

        let mut report = CycleReport {
            events: events.len(),
            ..Default::default()
        };

        for event in &events {
            match self.handle_event(event).await {
                Dispatch::Filtered => report.filtered += 1,
                Dispatch::Debounced => report.debounced += 1,
                Dispatch::Executed(_) => report.executed += 1,
                Dispatch::NoCommand => {}
            }

            if self.stop.is_set() {
                break;
            }
        }

        self.current = candidate;
        tracing::debug!(?report, "cycle finished");
        report
    }

    pub async fn handle_event(&mut self, event: &FileEvent) -> Dispatch {
        if !self.filter.should_process(&event.path) {
            return Dispatch::Filtered;
        }

        if self.config.show_events {
            self.sink.log(format!("File {}: {}", event.kind, event.path.display()));
        }

        let Some(command) = resolve_command(event.kind, &self.config).map(str::to_owned) else {
            return Dispatch::NoCommand;
        };

        if let DebounceDecision::Suppressed { remaining } = self.debouncer.try_fire() {
            tracing::trace!(path = %event.path.display(), ?remaining, "debounced");
            if self.config.show_events {
                self.sink.log(format!("Debouncing: {}", event.path.display()));
            }
            return Dispatch::Debounced;
        }

        let outcome = self.execute(event.kind, &command).await;

        if self.config.oneshot {
            self.sink.log("Oneshot mode: stopping after first run");
            self.stop.request_stop();
        }

        Dispatch::Executed(outcome)
    }

    async fn execute(&mut self, kind: EventKind, command: &str) -> ExecutionOutcome {
        self.sink.log(format!("Running: {}", command));
        let outcome = self.runner.run(command).await;
        tracing::debug!(command, %outcome, "command finished");
        self.sink.log(outcome.describe(kind.verb()));
        outcome
    }

    fn scan(&mut self) -> SnapshotSet {
        self.scans += 1;
        self.source.scan(&self.roots, self.config.recurse)
    }

    fn resolve_roots(&mut self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::new();

        for dir in self.config.effective_watch_dirs() {
            let path = absolute_root(&dir);

            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => {
                    if roots.contains(&path) {
                        continue;
                    }
                    self.sink.log(format!("Watching: {}", path.display()));
                    roots.push(path);
                }
                Ok(_) => {
                    self.sink.log(format!("Not a directory: {}", path.display()));
                }
                Err(err) => {
                    tracing::debug!(dir = %path.display(), error = %err, "cannot resolve watch root");
                    self.sink.log(format!("Directory not found: {}", path.display()));
                }
            }
        }

        roots
    }

    fn log_settings(&mut self) {
        let list = |items: &[String], empty: &str| {
            if items.is_empty() {
                empty.to_string()
            } else {
                items.join(", ")
            }
        };

        let patterns = list(self.filter.include_patterns(), "all files");
        let excludes = list(self.filter.exclude_patterns(), "none");
        self.sink.log(format!("Watching for changes (patterns: {})", patterns));
        self.sink.log(format!("Excludes: {}", excludes));
        self.sink.log(format!(
            "Debounce: {}ms, poll interval: {}s",
            self.config.debounce.as_millis(),
            self.config.poll_interval.as_secs_f64()
        ));
        if self.config.oneshot {
            self.sink.log("Mode: oneshot (will stop after first run)");
        }
    }

    async fn sleep_or_stop(&self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() && !self.stop.is_set() {
            let slice = remaining.min(STOP_CHECK_SLICE);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
        }
    }

    /// Enter `Stopped` and flush the sink. Runs at most once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.state = LoopState::Stopped;
        self.sink.log("Watcher stopped");
        self.sink.flush();
    }
}

/// Make `dir` absolute against the working directory and fold away `.` and
/// `..` components. Symlinks are kept as written so event paths carry the
/// configured root name.
fn absolute_root(dir: &Path) -> PathBuf {
    let joined = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(_) => dir.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
