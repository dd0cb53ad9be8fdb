//! User-facing log lines
//!
//! Every recoverable condition produces one `[HH:MM:SS] <message>` line. The
//! line always goes to stdout and is appended to the log file when one is
//! configured. Internal diagnostics go through `tracing` instead.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

const HISTORY_LIMIT: usize = 1000;

pub fn format_line(message: &str) -> String {
    format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
}

pub struct LogSink {
    file_path: Option<PathBuf>,
    file: Option<BufWriter<File>>,
    file_failed: bool,
    history: VecDeque<String>,
}

impl LogSink {
    /// Console-only sink.
    pub fn console() -> Self {
        Self {
            file_path: None,
            file: None,
            file_failed: false,
            history: VecDeque::new(),
        }
    }

    /// Sink that also appends to `path`. The file is opened on first use.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_path: Some(path.as_ref().to_path_buf()),
            file: None,
            file_failed: false,
            history: VecDeque::new(),
        }
    }

    pub fn from_config(config: &crate::config::WatchConfig) -> Self {
        match &config.log_file {
            Some(path) => Self::with_file(path),
            None => Self::console(),
        }
    }

    pub fn log(&mut self, message: impl AsRef<str>) {
        let line = format_line(message.as_ref());
        println!("{}", line);
        self.append_to_file(&line);

        self.history.push_back(line);
        if self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    fn append_to_file(&mut self, line: &str) {
        if self.file_failed {
            return;
        }
        let Some(path) = self.file_path.clone() else {
            return;
        };

        if self.file.is_none() {
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => self.file = Some(BufWriter::new(file)),
                Err(err) => {
                    self.report_failure(&path, &err);
                    return;
                }
            }
        }

        if let Some(writer) = self.file.as_mut() {
            if let Err(err) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                self.report_failure(&path, &err);
            }
        }
    }

    /// Reported once; console logging keeps going.
    fn report_failure(&mut self, path: &Path, err: &std::io::Error) {
        eprintln!("Failed to write to log file {}: {}", path.display(), err);
        self.file_failed = true;
        self.file = None;
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.file.as_mut() {
            if let Err(err) = writer.flush() {
                tracing::warn!("Failed to flush log file: {}", err);
            }
        }
    }

    /// Most recent lines, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.history.iter().any(|line| line.contains(needle))
    }

    pub fn file_failed(&self) -> bool {
        self.file_failed
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.flush();
    }
}
