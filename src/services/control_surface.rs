//! Control Surface for tabplay.
//!
//! The popup side: reads the shared collection, renders it, turns button
//! presses into playback and volume commands, and follows storage change
//! notifications so it stays consistent with what other contexts write.
//! A popup lives only while it is open; nothing here outlives it.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::host::TabService;
use crate::managers::media_tab_store::{self, MediaTabStore};
use crate::services::license_gate::{LicenseChanges, LicenseGate};
use crate::services::media_probe::MediaProber;
use crate::services::playback::PlaybackController;
use crate::services::site_labels::{normalize_domain, playing_summary, site_label};
use crate::storage::KeyValueStore;
use crate::types::errors::{ControlError, MediaError, StorageError};
use crate::types::license::{Feature, LicenseState, Tier};
use crate::types::media_tab::{MediaTabs, TabId, TabRecord};
use crate::types::settings::{PopupSettings, ThemePreference};
use crate::types::storage::StorageChange;
use crate::types::view::{
    PopupView, RowStatus, TabGroup, TabListView, TabRow, VolumeInteraction, VolumeSlider,
};

/// Local storage key of the theme preference.
pub const THEME_KEY: &str = "theme";

/// Placeholder shown when no tab is tracked.
pub const EMPTY_MESSAGE: &str = "No media tabs found";

/// Slider label, e.g. `0.75` becomes `"75%"`.
pub fn volume_label(volume: f32) -> String {
    format!("{}%", (volume.clamp(0.0, 1.0) * 100.0).round() as u32)
}

fn volume_unlocked(tier: Tier) -> bool {
    tier.satisfies(Feature::VolumeControl.required_tier())
}

fn record_domain(record: &TabRecord) -> String {
    record
        .domain
        .clone()
        .or_else(|| record.url.as_deref().and_then(normalize_domain))
        .unwrap_or_default()
}

fn build_row(record: &TabRecord, unlocked: bool, settings: &PopupSettings) -> TabRow {
    let (status, action_label) = if record.is_playing {
        (RowStatus::Playing, "Pause")
    } else {
        (RowStatus::Paused, "Play")
    };
    let volume = if unlocked {
        let value = record.volume.unwrap_or(1.0);
        VolumeSlider::Enabled {
            value,
            label: volume_label(value),
        }
    } else {
        VolumeSlider::Locked
    };
    TabRow {
        id: record.id,
        title: record.title.clone(),
        icon_url: record
            .fav_icon_url
            .clone()
            .unwrap_or_else(|| settings.default_icon.clone()),
        status,
        action_label: action_label.to_string(),
        volume,
    }
}

/// Builds the popup view from a snapshot of the collection.
///
/// Rows are sorted by `lastAccessed`, newest first. With more than one
/// distinct domain (and grouping enabled) rows are grouped by domain, groups
/// ordered by their most recent tab.
pub fn build_view(
    tabs: &MediaTabs,
    theme: ThemePreference,
    tier: Tier,
    settings: &PopupSettings,
) -> PopupView {
    let unlocked = volume_unlocked(tier);
    let sorted = tabs.sorted_by_recent();

    let list = if sorted.is_empty() {
        TabListView::Empty {
            message: EMPTY_MESSAGE.to_string(),
        }
    } else {
        let mut domains: Vec<String> = Vec::new();
        let mut groups: Vec<Vec<&TabRecord>> = Vec::new();
        for &record in &sorted {
            let domain = record_domain(record);
            match domains.iter().position(|d| *d == domain) {
                Some(index) => groups[index].push(record),
                None => {
                    domains.push(domain);
                    groups.push(vec![record]);
                }
            }
        }

        if settings.group_by_domain && domains.len() > 1 {
            let groups = domains
                .into_iter()
                .zip(groups)
                .map(|(domain, records): (String, Vec<&TabRecord>)| {
                    let playing_count = records.iter().filter(|r| r.is_playing).count();
                    TabGroup {
                        label: site_label(&domain),
                        summary: playing_summary(playing_count, records.len()),
                        playing_count,
                        rows: records
                            .into_iter()
                            .map(|r| build_row(r, unlocked, settings))
                            .collect(),
                        domain,
                    }
                })
                .collect();
            TabListView::Grouped { groups }
        } else {
            TabListView::Flat {
                rows: sorted
                    .iter()
                    .map(|r| build_row(r, unlocked, settings))
                    .collect(),
            }
        }
    };

    PopupView {
        theme,
        tier,
        volume_unlocked: unlocked,
        list,
    }
}

enum Wake {
    Local(Result<StorageChange, RecvError>),
    License(Option<LicenseState>),
}

/// One open popup.
pub struct ControlSurface {
    store: MediaTabStore,
    local: Arc<dyn KeyValueStore>,
    license: LicenseGate,
    prober: MediaProber,
    playback: PlaybackController,
    host_tabs: Arc<dyn TabService>,
    settings: PopupSettings,
    theme: ThemePreference,
    tier: Tier,
    tabs: MediaTabs,
    local_changes: broadcast::Receiver<StorageChange>,
    license_changes: LicenseChanges,
}

impl ControlSurface {
    /// Opens the popup: subscribes to both change feeds, then loads the
    /// theme, license and collection.
    pub async fn open(
        store: MediaTabStore,
        local: Arc<dyn KeyValueStore>,
        license: LicenseGate,
        prober: MediaProber,
        playback: PlaybackController,
        host_tabs: Arc<dyn TabService>,
        settings: PopupSettings,
    ) -> Result<Self, ControlError> {
        let local_changes = local.subscribe();
        let license_changes = license.subscribe();
        let mut surface = Self {
            store,
            local,
            license,
            prober,
            playback,
            host_tabs,
            settings,
            theme: ThemePreference::default(),
            tier: Tier::Free,
            tabs: MediaTabs::new(),
            local_changes,
            license_changes,
        };
        surface.reload().await?;
        log::debug!("popup opened with {} media tab(s)", surface.tabs.len());
        Ok(surface)
    }

    pub fn theme(&self) -> ThemePreference {
        self.theme
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// The collection as last read.
    pub fn tabs(&self) -> &MediaTabs {
        &self.tabs
    }

    pub fn render(&self) -> PopupView {
        build_view(&self.tabs, self.theme, self.tier, &self.settings)
    }

    /// Re-reads everything from storage and renders.
    pub async fn reload(&mut self) -> Result<PopupView, ControlError> {
        self.theme = self.load_theme().await?;
        self.tier = self.license.get().await?.tier;
        self.tabs = self.store.load().await?;
        Ok(self.render())
    }

    async fn load_theme(&self) -> Result<ThemePreference, StorageError> {
        Ok(match self.local.get(THEME_KEY).await? {
            Some(entry) => serde_json::from_value(entry.value).unwrap_or_else(|e| {
                log::warn!("stored theme is unreadable, using default: {}", e);
                ThemePreference::default()
            }),
            None => ThemePreference::default(),
        })
    }

    async fn reload_tabs(&mut self) -> Result<PopupView, ControlError> {
        self.tabs = self.store.load().await?;
        Ok(self.render())
    }

    /// Probes every open tab concurrently, then reloads.
    pub async fn refresh(&mut self) -> Result<PopupView, ControlError> {
        let open = self
            .host_tabs
            .query_tabs()
            .await
            .map_err(MediaError::from)?;
        let probes = open.iter().map(|tab| self.prober.probe_quietly(tab.id));
        let tracked = join_all(probes).await.into_iter().flatten().count();
        log::debug!("refresh probed {} of {} tab(s)", tracked, open.len());
        self.reload_tabs().await
    }

    /// Flips one tab. Host failures leave the tab as it was and still re-render.
    pub async fn toggle(&mut self, tab_id: TabId) -> Result<PopupView, ControlError> {
        match self.playback.toggle(tab_id, None).await {
            Ok(outcome) => log::debug!("tab {} is now {:?}", tab_id, outcome.state),
            Err(MediaError::Host(e)) => log::warn!("toggling tab {} failed: {}", tab_id, e),
            Err(e) => return Err(e.into()),
        }
        self.reload_tabs().await
    }

    pub async fn pause_all(&mut self) -> Result<PopupView, ControlError> {
        let playing = self.store.load().await?.ids_where_playing(true);
        self.playback.set_many(&playing, true).await?;
        self.reload_tabs().await
    }

    pub async fn play_all(&mut self) -> Result<PopupView, ControlError> {
        let paused = self.store.load().await?.ids_where_playing(false);
        self.playback.set_many(&paused, false).await?;
        self.reload_tabs().await
    }

    /// What a click on a row's volume slider does.
    pub fn volume_clicked(&self, tab_id: TabId) -> VolumeInteraction {
        if volume_unlocked(self.tier) {
            VolumeInteraction::Ready
        } else {
            log::debug!("volume on tab {} is locked for tier {}", tab_id, self.tier.as_str());
            VolumeInteraction::UpgradePrompt
        }
    }

    /// Live label while the slider is dragged.
    pub fn preview_volume(&self, volume: f32) -> String {
        volume_label(volume)
    }

    /// Applies a volume to a tab once the slider is released.
    pub async fn commit_volume(
        &mut self,
        tab_id: TabId,
        volume: f32,
    ) -> Result<PopupView, ControlError> {
        if !self.license.has(Feature::VolumeControl).await? {
            return Err(ControlError::PremiumRequired(Feature::VolumeControl));
        }
        if !(0.0..=1.0).contains(&volume) {
            return Err(ControlError::InvalidVolume(volume));
        }
        self.playback.set_volume(tab_id, volume).await?;
        self.reload_tabs().await
    }

    pub async fn toggle_theme(&mut self) -> Result<PopupView, ControlError> {
        let theme = self.theme.toggled();
        let value = serde_json::to_value(theme).map_err(StorageError::from)?;
        self.local.set(THEME_KEY, value).await?;
        self.theme = theme;
        Ok(self.render())
    }

    pub async fn activate_license(&mut self, key: &str) -> Result<PopupView, ControlError> {
        self.tier = self.license.activate(key).await?;
        Ok(self.render())
    }

    pub async fn deactivate_license(&mut self) -> Result<PopupView, ControlError> {
        self.license.deactivate().await?;
        self.tier = Tier::Free;
        Ok(self.render())
    }

    /// Folds a change notification into the popup state. Returns whether the
    /// change was relevant.
    pub async fn handle_storage_change(&mut self, change: &StorageChange) -> bool {
        if self.store.is_change(change) {
            self.tabs = match change.new_value.clone() {
                Some(value) => match media_tab_store::decode(value) {
                    Ok(tabs) => tabs,
                    Err(e) => {
                        log::warn!("unreadable mediaTabs change, reloading: {}", e);
                        match self.store.load().await {
                            Ok(tabs) => tabs,
                            Err(e) => {
                                log::warn!("reloading mediaTabs failed: {}", e);
                                return false;
                            }
                        }
                    }
                },
                None => MediaTabs::new(),
            };
            return true;
        }
        if change.concerns(self.local.area(), THEME_KEY) {
            self.theme = change
                .new_value
                .clone()
                .and_then(|value| serde_json::from_value(value).ok())
                .unwrap_or_default();
            return true;
        }
        if let Some(state) = self.license.apply_change(change).await {
            self.tier = state.tier;
            return true;
        }
        false
    }

    /// Waits for the next relevant change from either store and returns the
    /// re-rendered view. `None` once both feeds are closed.
    pub async fn next_change(&mut self) -> Option<PopupView> {
        loop {
            let wake = tokio::select! {
                change = self.local_changes.recv() => Wake::Local(change),
                state = self.license_changes.next() => Wake::License(state),
            };
            match wake {
                Wake::Local(Ok(change)) => {
                    if self.handle_storage_change(&change).await {
                        return Some(self.render());
                    }
                }
                Wake::Local(Err(RecvError::Lagged(skipped))) => {
                    log::debug!("popup lagged {} change(s), reloading", skipped);
                    match self.reload().await {
                        Ok(view) => return Some(view),
                        Err(e) => log::warn!("popup reload failed: {}", e),
                    }
                }
                Wake::Local(Err(RecvError::Closed)) => return None,
                Wake::License(Some(state)) => {
                    self.tier = state.tier;
                    return Some(self.render());
                }
                Wake::License(None) => return None,
            }
        }
    }
}
