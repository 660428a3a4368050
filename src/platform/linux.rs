// Linux roots follow the XDG base directory layout.

use std::env;
use std::path::PathBuf;

fn xdg_root(var: &str, fallback: &[&str]) -> PathBuf {
    match env::var_os(var) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = env::var_os("HOME").unwrap_or_else(|| "/tmp".into());
            fallback
                .iter()
                .fold(PathBuf::from(home), |path, part| path.join(part))
        }
    }
}

pub fn config_root() -> PathBuf {
    xdg_root("XDG_CONFIG_HOME", &[".config"])
}

pub fn data_root() -> PathBuf {
    xdg_root("XDG_DATA_HOME", &[".local", "share"])
}
