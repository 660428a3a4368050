use serde::{Deserialize, Serialize};

use super::media_tab::TabId;

/// Tab metadata as reported by the host's tab service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub active: bool,
}

/// Page load status reported with tab updates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// What changed in a tab-updated event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabChangeInfo {
    #[serde(default)]
    pub audible: Option<bool>,
    #[serde(default)]
    pub status: Option<LoadStatus>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl TabChangeInfo {
    pub fn audible(audible: bool) -> Self {
        Self {
            audible: Some(audible),
            ..Default::default()
        }
    }

    pub fn complete() -> Self {
        Self {
            status: Some(LoadStatus::Complete),
            ..Default::default()
        }
    }

    /// An audible flip or a finished load can change what media the tab holds.
    pub fn warrants_probe(&self) -> bool {
        self.audible.is_some() || self.status == Some(LoadStatus::Complete)
    }
}

/// Keyboard-triggered batch actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    PauseAll,
    PlayAll,
    ToggleCurrent,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Command> {
        match name {
            "pause-all" => Some(Command::PauseAll),
            "play-all" => Some(Command::PlayAll),
            "toggle-current" => Some(Command::ToggleCurrent),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::PauseAll => "pause-all",
            Command::PlayAll => "play-all",
            Command::ToggleCurrent => "toggle-current",
        }
    }
}

/// Events the host delivers to the background context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrowserEvent {
    Created { tab: TabInfo },
    Updated { tab_id: TabId, change: TabChangeInfo },
    Removed { tab_id: TabId },
    Command { command: Command },
}
