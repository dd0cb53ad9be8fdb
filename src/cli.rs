use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{load_config, ConfigError, WatchConfig};
use crate::core::EventKind;

#[derive(Parser, Debug)]
#[command(name = "watchrun")]
#[command(version)]
#[command(about = "Watch files for changes and run commands automatically")]
#[command(long_about = "watchrun polls directories for created, modified and deleted files and runs a shell command in response. Useful for re-running tests, builds, linters or docs generation on save.")]
#[command(after_help = "Examples:
  watchrun --command \"pytest\"
  watchrun -p .py -c pytest
  watchrun -c \"npm run build\" -x node_modules
  watchrun -p .js,.ts,.jsx,.tsx -c \"npm test\" --initial-run
  watchrun --oneshot -p .py -c pytest --initial-run")]
pub struct Cli {
    /// Directory to watch (can repeat)
    #[arg(short = 'd', long = "dir", value_name = "DIR", help = "Directory to watch (can repeat, defaults to current directory)")]
    pub dirs: Vec<PathBuf>,

    /// Include patterns
    #[arg(short, long, value_delimiter = ',', help = "File patterns to watch, e.g. .py,.rs or src/")]
    pub patterns: Option<Vec<String>>,

    /// Exclude patterns
    #[arg(short = 'x', long, value_delimiter = ',', help = "Patterns to exclude")]
    pub exclude: Option<Vec<String>>,

    #[arg(short, long, help = "Command to run on any change")]
    pub command: Option<String>,

    #[arg(long, help = "Command to run on file creation")]
    pub on_create: Option<String>,

    #[arg(long, help = "Command to run on file modification")]
    pub on_modify: Option<String>,

    #[arg(long, help = "Command to run on file deletion")]
    pub on_delete: Option<String>,

    #[arg(long, help = "Accepted for compatibility; moves run the delete and create commands")]
    pub on_move: Option<String>,

    #[arg(long, value_name = "MS", help = "Debounce time in milliseconds [default: 300]")]
    pub debounce: Option<u64>,

    #[arg(long, value_name = "SECS", help = "Poll interval in seconds [default: 1.0]")]
    pub poll: Option<f64>,

    #[arg(long, value_name = "SECS", help = "Command timeout in seconds [default: 300]")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Do not watch subdirectories")]
    pub no_recurse: bool,

    #[arg(long, help = "Stop after the first command run")]
    pub oneshot: bool,

    #[arg(long, help = "Run the command once on start")]
    pub initial_run: bool,

    #[arg(long, help = "Log every file event")]
    pub show_events: bool,

    #[arg(long, value_name = "FILE", help = "Also append log lines to this file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Save configuration to file and exit")]
    pub save_config: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Load configuration from file")]
    pub load_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose diagnostics on stderr")]
    pub verbose: bool,
}

fn clean_patterns(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl Cli {
    /// Build the session configuration. A loaded config file is the base;
    /// flags given on the command line override it.
    pub fn to_config(&self) -> Result<WatchConfig, ConfigError> {
        let mut config = match &self.load_config {
            Some(path) => load_config(path)?,
            None => WatchConfig::default(),
        };

        if !self.dirs.is_empty() {
            config.watch_dirs = self.dirs.clone();
        }
        if let Some(patterns) = &self.patterns {
            config.include_patterns = clean_patterns(patterns);
        }
        if let Some(exclude) = &self.exclude {
            config.exclude_patterns = clean_patterns(exclude);
        }

        if let Some(command) = &self.command {
            config.commands.default = Some(command.clone());
        }
        for (kind, command) in [
            (EventKind::Created, &self.on_create),
            (EventKind::Modified, &self.on_modify),
            (EventKind::Deleted, &self.on_delete),
        ] {
            if let Some(command) = command {
                config.commands.overrides.insert(kind, command.clone());
            }
        }
        if let Some(on_move) = &self.on_move {
            config.on_move = Some(on_move.clone());
        }

        if let Some(ms) = self.debounce {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(secs) = self.poll {
            config.poll_interval = Duration::try_from_secs_f64(secs).map_err(|_| {
                ConfigError::Invalid(format!("poll interval must be a positive number (got {})", secs))
            })?;
        }
        if let Some(secs) = self.timeout {
            config.command_timeout = Duration::from_secs(secs);
        }

        if self.no_recurse {
            config.recurse = false;
        }
        if self.oneshot {
            config.oneshot = true;
        }
        if self.initial_run {
            config.initial_run = true;
        }
        if self.show_events {
            config.show_events = true;
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        // stdout carries log lines and command output
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
