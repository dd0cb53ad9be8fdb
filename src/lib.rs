pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod exec;
pub mod logging;
pub mod watcher;

pub use crate::config::{load_config, save_config, CommandTable, ConfigError, WatchConfig};
pub use crate::core::*;
pub use crate::dispatch::*;
pub use crate::exec::*;
pub use crate::logging::LogSink;
pub use crate::watcher::*;
