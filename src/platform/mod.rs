//! Per-OS locations for the settings file and the extension databases.
//!
//! Each target provides the roots; the application directory name is added
//! here so every platform agrees on it.

use std::env;
use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as os;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use macos as os;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use windows as os;

/// Directory name under the platform roots.
pub const APP_DIR_NAME: &str = "tabplay";

/// Overrides [`get_data_dir`] for the RPC binary.
pub const DATA_DIR_ENV: &str = "TABPLAY_DATA_DIR";

/// Settings directory.
///
/// - **Linux**: `$XDG_CONFIG_HOME/tabplay` or `~/.config/tabplay`
/// - **macOS**: `~/Library/Application Support/tabplay`
/// - **Windows**: `%APPDATA%/tabplay`
pub fn get_config_dir() -> PathBuf {
    os::config_root().join(APP_DIR_NAME)
}

/// Database directory.
///
/// - **Linux**: `$XDG_DATA_HOME/tabplay` or `~/.local/share/tabplay`
/// - **macOS**: `~/Library/Application Support/tabplay`
/// - **Windows**: `%APPDATA%/tabplay`
pub fn get_data_dir() -> PathBuf {
    os::data_root().join(APP_DIR_NAME)
}

/// [`get_data_dir`] unless `TABPLAY_DATA_DIR` is set to a non-empty path.
pub fn resolve_data_dir() -> PathBuf {
    match env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => get_data_dir(),
    }
}
