// macOS keeps settings and data together under Application Support.

use std::env;
use std::path::PathBuf;

fn application_support() -> PathBuf {
    let home = env::var_os("HOME").unwrap_or_else(|| "/tmp".into());
    PathBuf::from(home).join("Library").join("Application Support")
}

pub fn config_root() -> PathBuf {
    application_support()
}

pub fn data_root() -> PathBuf {
    application_support()
}
