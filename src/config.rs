//! Configuration for a watch session
//!
//! [`WatchConfig`] is the immutable record every component reads from. It is
//! built once (from CLI flags or a config file) and shared behind an `Arc`.
//! [`ConfigFile`] is its persisted form, with the flat key layout used on
//! disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::EventKind;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 1.0;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed TOML config: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("cannot encode TOML config: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Commands to run per event type, with one generic fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    pub default: Option<String>,
    pub overrides: BTreeMap<EventKind, String>,
}

impl CommandTable {
    pub fn with_default(command: impl Into<String>) -> Self {
        Self {
            default: Some(command.into()),
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, kind: EventKind, command: impl Into<String>) -> Self {
        self.overrides.insert(kind, command.into());
        self
    }

    /// Command for `kind`: the specific entry, else the fallback.
    pub fn resolve(&self, kind: EventKind) -> Option<&str> {
        self.overrides
            .get(&kind)
            .or(self.default.as_ref())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.overrides.is_empty()
    }
}

/// Parameters for one watch session. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    pub watch_dirs: Vec<PathBuf>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub commands: CommandTable,
    /// Accepted for compatibility; moves are seen as delete + create.
    pub on_move: Option<String>,
    pub debounce: Duration,
    pub poll_interval: Duration,
    pub command_timeout: Duration,
    pub recurse: bool,
    pub oneshot: bool,
    pub initial_run: bool,
    pub show_events: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watch_dirs: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            commands: CommandTable::default(),
            on_move: None,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            poll_interval: Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            recurse: true,
            oneshot: false,
            initial_run: false,
            show_events: false,
            log_file: None,
        }
    }
}

impl WatchConfig {
    /// Roots to watch; the current directory when none are configured.
    pub fn effective_watch_dirs(&self) -> Vec<PathBuf> {
        if self.watch_dirs.is_empty() {
            vec![std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))]
        } else {
            self.watch_dirs.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll_interval must be greater than 0".to_string(),
            ));
        }

        if self.command_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "command_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// On-disk layout of a [`WatchConfig`]. Missing keys take their defaults and
/// empty command strings mean "not configured".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub watch_dirs: Vec<String>,
    pub watch_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub command: String,
    pub on_create: String,
    pub on_modify: String,
    pub on_delete: String,
    pub on_move: String,
    pub debounce_ms: u64,
    pub poll_interval: f64,
    pub command_timeout_secs: u64,
    pub recurse: bool,
    pub oneshot: bool,
    pub initial_run: bool,
    pub show_events: bool,
    pub log_file: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            watch_dirs: Vec::new(),
            watch_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            command: String::new(),
            on_create: String::new(),
            on_modify: String::new(),
            on_delete: String::new(),
            on_move: String::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            recurse: true,
            oneshot: false,
            initial_run: false,
            show_events: false,
            log_file: None,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl TryFrom<ConfigFile> for WatchConfig {
    type Error = ConfigError;

    fn try_from(raw: ConfigFile) -> Result<Self, Self::Error> {
        let poll_interval = Duration::try_from_secs_f64(raw.poll_interval)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "poll_interval must be a positive number of seconds (got {})",
                    raw.poll_interval
                ))
            })?;

        let mut commands = CommandTable {
            default: non_empty(raw.command),
            overrides: BTreeMap::new(),
        };
        for (kind, command) in [
            (EventKind::Created, raw.on_create),
            (EventKind::Modified, raw.on_modify),
            (EventKind::Deleted, raw.on_delete),
        ] {
            if let Some(command) = non_empty(command) {
                commands.overrides.insert(kind, command);
            }
        }

        let config = WatchConfig {
            watch_dirs: raw.watch_dirs.into_iter().map(PathBuf::from).collect(),
            include_patterns: raw.watch_patterns,
            exclude_patterns: raw.exclude_patterns,
            commands,
            on_move: non_empty(raw.on_move),
            debounce: Duration::from_millis(raw.debounce_ms),
            poll_interval,
            command_timeout: Duration::from_secs(raw.command_timeout_secs),
            recurse: raw.recurse,
            oneshot: raw.oneshot,
            initial_run: raw.initial_run,
            show_events: raw.show_events,
            log_file: raw.log_file.and_then(non_empty).map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<&WatchConfig> for ConfigFile {
    fn from(config: &WatchConfig) -> Self {
        let command_for = |kind: EventKind| {
            config
                .commands
                .overrides
                .get(&kind)
                .cloned()
                .unwrap_or_default()
        };

        Self {
            watch_dirs: config
                .watch_dirs
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            watch_patterns: config.include_patterns.clone(),
            exclude_patterns: config.exclude_patterns.clone(),
            command: config.commands.default.clone().unwrap_or_default(),
            on_create: command_for(EventKind::Created),
            on_modify: command_for(EventKind::Modified),
            on_delete: command_for(EventKind::Deleted),
            on_move: config.on_move.clone().unwrap_or_default(),
            debounce_ms: config.debounce.as_millis() as u64,
            poll_interval: config.poll_interval.as_secs_f64(),
            command_timeout_secs: config.command_timeout.as_secs(),
            recurse: config.recurse,
            oneshot: config.oneshot,
            initial_run: config.initial_run,
            show_events: config.show_events,
            log_file: config
                .log_file
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

/// Parse a config file without validating it. `.toml` files are read as
/// TOML, everything else as JSON.
pub fn parse_config_file(path: &Path, contents: &str) -> Result<ConfigFile, ConfigError> {
    if is_toml(path) {
        Ok(toml::from_str(contents)?)
    } else {
        Ok(serde_json::from_str(contents)?)
    }
}

/// Load and validate a watch configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<WatchConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let raw = parse_config_file(path, &contents)?;
    WatchConfig::try_from(raw)
}

/// Write `config` to `path`, creating parent directories as needed.
pub fn save_config<P: AsRef<Path>>(config: &WatchConfig, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let raw = ConfigFile::from(config);

    let mut contents = if is_toml(path) {
        toml::to_string_pretty(&raw)?
    } else {
        serde_json::to_string_pretty(&raw)?
    };
    contents.push('\n');

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    fs::write(path, contents).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
