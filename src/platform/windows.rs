// Windows keeps settings and data in the roaming profile.

use std::env;
use std::path::PathBuf;

fn roaming_app_data() -> PathBuf {
    env::var_os("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("C:\\Users\\Default\\AppData\\Roaming"))
}

pub fn config_root() -> PathBuf {
    roaming_app_data()
}

pub fn data_root() -> PathBuf {
    roaming_app_data()
}
