use serde::Serialize;

use super::license::Tier;
use super::media_tab::TabId;
use super::settings::ThemePreference;

/// Everything the popup needs to draw itself.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PopupView {
    pub theme: ThemePreference,
    pub tier: Tier,
    pub volume_unlocked: bool,
    pub list: TabListView,
}

impl PopupView {
    /// All rows in display order, flattening groups.
    pub fn rows(&self) -> Vec<&TabRow> {
        match &self.list {
            TabListView::Empty { .. } => Vec::new(),
            TabListView::Flat { rows } => rows.iter().collect(),
            TabListView::Grouped { groups } => groups.iter().flat_map(|g| g.rows.iter()).collect(),
        }
    }

    pub fn row(&self, tab_id: TabId) -> Option<&TabRow> {
        self.rows().into_iter().find(|r| r.id == tab_id)
    }
}

/// The tab list, flat or grouped by site.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum TabListView {
    Empty { message: String },
    Flat { rows: Vec<TabRow> },
    Grouped { groups: Vec<TabGroup> },
}

/// Rows sharing a normalized domain.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TabGroup {
    pub domain: String,
    pub label: String,
    pub playing_count: usize,
    pub summary: String,
    pub rows: Vec<TabRow>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Playing,
    Paused,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TabRow {
    pub id: TabId,
    pub title: String,
    pub icon_url: String,
    pub status: RowStatus,
    /// Label of the play/pause button.
    pub action_label: String,
    pub volume: VolumeSlider,
}

/// Per-row volume control.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VolumeSlider {
    /// Rendered disabled; clicking opens the upgrade prompt.
    Locked,
    Enabled { value: f32, label: String },
}

/// Response to a click on a volume slider.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VolumeInteraction {
    UpgradePrompt,
    Ready,
}
