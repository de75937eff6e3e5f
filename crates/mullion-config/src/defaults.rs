//! Built-in defaults shared by the daemon and the config model.

use crate::logging::LogFormat;

/// Relative suffix appended to `$HOME` to derive the config path.
pub const CONFIG_FILE_SUFFIX: &str = ".mullionrc";

/// Default number of virtual desktops.
pub const DEFAULT_DESKTOP_COUNT: u32 = 4;

/// Default frame border width in pixels.
pub const DEFAULT_BORDER_WIDTH: u16 = 4;

/// Default title bar height in pixels.
pub const DEFAULT_TITLE_HEIGHT: u16 = 20;

/// Default double-click interval in milliseconds.
pub const DEFAULT_DOUBLE_CLICK_SPEED_MS: u32 = 400;

/// Default double-click movement tolerance in pixels.
pub const DEFAULT_DOUBLE_CLICK_DELTA: u16 = 2;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

pub(crate) fn default_desktop_count() -> u32 {
    DEFAULT_DESKTOP_COUNT
}

pub(crate) fn default_border_width() -> u16 {
    DEFAULT_BORDER_WIDTH
}

pub(crate) fn default_title_height() -> u16 {
    DEFAULT_TITLE_HEIGHT
}

pub(crate) fn default_double_click_speed() -> u32 {
    DEFAULT_DOUBLE_CLICK_SPEED_MS
}

pub(crate) fn default_double_click_delta() -> u16 {
    DEFAULT_DOUBLE_CLICK_DELTA
}

pub(crate) fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

pub(crate) fn default_log_format() -> LogFormat {
    LogFormat::default()
}
