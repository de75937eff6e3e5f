//! Configuration model for the mullion window-management daemon.
//!
//! The daemon resolves its configuration from built-in defaults overlaid by
//! an optional TOML rc file. The file lives at `$HOME/.mullionrc`; when
//! `HOME` is unset the suffix alone is used, relative to the working
//! directory. The rc file is re-read at the top of every restart cycle, so
//! an in-place restart picks up edits without reconnecting to the server.
//!
//! The model stays deliberately small: only the knobs owned by the
//! lifecycle core live here. Subsystem-specific settings are populated by
//! the subsystems themselves during their initialize/startup hooks.

mod defaults;
mod logging;

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

pub use defaults::{
    CONFIG_FILE_SUFFIX, DEFAULT_BORDER_WIDTH, DEFAULT_DESKTOP_COUNT, DEFAULT_DOUBLE_CLICK_DELTA,
    DEFAULT_DOUBLE_CLICK_SPEED_MS, DEFAULT_LOG_FILTER, DEFAULT_TITLE_HEIGHT,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Focus policy applied by the client subsystem.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FocusModel {
    /// Focus follows the pointer.
    #[default]
    Sloppy,
    /// Focus changes on click.
    Click,
}

/// Logging settings carried in the `[log]` table of the rc file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// Filter expression in `tracing_subscriber::EnvFilter` syntax.
    pub filter: String,
    /// Output format for the subscriber.
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: defaults::default_log_filter(),
            format: defaults::default_log_format(),
        }
    }
}

/// Resolved daemon configuration.
///
/// Every field has a built-in default, so a missing rc file yields a fully
/// usable configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of virtual desktops.
    pub desktops: u32,
    /// Frame border width in pixels.
    pub border_width: u16,
    /// Title bar height in pixels.
    pub title_height: u16,
    /// Double-click interval in milliseconds.
    pub double_click_speed: u32,
    /// Double-click movement tolerance in pixels.
    pub double_click_delta: u16,
    /// Focus policy.
    pub focus_model: FocusModel,
    /// Shell command executed in place of the process on final exit.
    pub exit_command: Option<String>,
    /// Logging settings.
    pub log: LogSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            desktops: defaults::default_desktop_count(),
            border_width: defaults::default_border_width(),
            title_height: defaults::default_title_height(),
            double_click_speed: defaults::default_double_click_speed(),
            double_click_delta: defaults::default_double_click_delta(),
            focus_model: FocusModel::default(),
            exit_command: None,
            log: LogSettings::default(),
        }
    }
}

/// Errors surfaced while loading or rendering configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The rc file does not exist.
    #[error("config file '{path}' not found")]
    Missing {
        /// Path that was probed.
        path: PathBuf,
    },
    /// The rc file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The rc file is not valid TOML for the config model.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },
    /// The resolved configuration could not be rendered to TOML.
    #[error("failed to render configuration: {source}")]
    Render {
        /// Underlying TOML error.
        #[source]
        source: toml::ser::Error,
    },
}

impl Config {
    /// Loads the configuration from the given rc file.
    ///
    /// Fields absent from the file keep their defaults. A missing file is
    /// reported as [`ConfigError::Missing`] so callers can decide whether
    /// defaults are acceptable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Renders the resolved configuration as pretty-printed TOML.
    pub fn render(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|source| ConfigError::Render { source })
    }
}

impl fmt::Display for Config {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(rendered) => formatter.write_str(&rendered),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Derives the rc file path from the `HOME` environment variable.
///
/// `HOME` is read once at process startup; with it unset the suffix alone
/// is used, relative to the working directory.
pub fn config_path() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(CONFIG_FILE_SUFFIX),
        None => PathBuf::from(CONFIG_FILE_SUFFIX),
    }
}
