use serde::{Deserialize, Serialize};

use super::page::ResumeStrategy;

/// Top-level extension settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExtensionSettings {
    pub monitor: MonitorSettings,
    pub playback: PlaybackSettings,
    pub popup: PopupSettings,
    pub storage: StorageSettings,
}

/// Background tab monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSettings {
    /// URL scheme prefixes where injection is never attempted.
    pub restricted_schemes: Vec<String>,
    pub probe_on_create: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            restricted_schemes: vec![
                "chrome".to_string(),
                "edge".to_string(),
                "about".to_string(),
                "devtools".to_string(),
                "view-source".to_string(),
            ],
            probe_on_create: true,
        }
    }
}

/// Playback control settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackSettings {
    pub resume_strategies: Vec<ResumeStrategy>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            resume_strategies: ResumeStrategy::defaults(),
        }
    }
}

/// Popup rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopupSettings {
    pub default_icon: String,
    pub group_by_domain: bool,
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            default_icon: "icons/icon16.png".to_string(),
            group_by_domain: true,
        }
    }
}

/// Shared storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// Compare-and-set attempts before an update gives up.
    pub cas_max_retries: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { cas_max_retries: 8 }
    }
}

/// Popup color theme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
}

impl ThemePreference {
    pub fn toggled(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
        }
    }
}
