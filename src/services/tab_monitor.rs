//! Tab Monitor for tabplay.
//!
//! Background-side handlers that keep the shared media tab collection in line
//! with real tab state. Only reacts to host events; never polls. A failure on
//! one tab is logged and never aborts the handler for other tabs.

use std::sync::Arc;

use crate::host::TabService;
use crate::managers::media_tab_store::MediaTabStore;
use crate::services::media_probe::{MediaProber, ProbeOutcome};
use crate::services::playback::{PlaybackController, ToggleOutcome};
use crate::types::errors::MediaError;
use crate::types::events::{BrowserEvent, Command, TabChangeInfo, TabInfo};
use crate::types::media_tab::TabId;

/// Event handlers for the long-lived background context.
#[derive(Clone)]
pub struct TabMonitor {
    tabs: Arc<dyn TabService>,
    store: MediaTabStore,
    prober: MediaProber,
    playback: PlaybackController,
    probe_on_create: bool,
}

impl TabMonitor {
    pub fn new(
        tabs: Arc<dyn TabService>,
        store: MediaTabStore,
        prober: MediaProber,
        playback: PlaybackController,
        probe_on_create: bool,
    ) -> Self {
        Self {
            tabs,
            store,
            prober,
            playback,
            probe_on_create,
        }
    }

    /// Dispatches a host event to its handler.
    pub async fn handle_event(&self, event: BrowserEvent) {
        match event {
            BrowserEvent::Created { tab } => {
                self.on_tab_created(&tab).await;
            }
            BrowserEvent::Updated { tab_id, change } => {
                self.on_tab_updated(tab_id, &change).await;
            }
            BrowserEvent::Removed { tab_id } => {
                self.on_tab_removed(tab_id).await;
            }
            BrowserEvent::Command { command } => {
                self.on_command(command).await;
            }
        }
    }

    /// Probes the tab if the change can affect its media. Returns whether it probed.
    pub async fn on_tab_updated(&self, tab_id: TabId, change: &TabChangeInfo) -> bool {
        if !change.warrants_probe() {
            return false;
        }
        self.prober.probe_quietly(tab_id).await;
        true
    }

    pub async fn on_tab_created(&self, tab: &TabInfo) -> Option<ProbeOutcome> {
        if !self.probe_on_create {
            return None;
        }
        self.prober.probe_quietly(tab.id).await
    }

    /// Drops a closed tab from the collection. Returns whether it was tracked.
    pub async fn on_tab_removed(&self, tab_id: TabId) -> bool {
        match self.store.remove(tab_id).await {
            Ok(removed) => {
                if removed {
                    log::debug!("tab {} closed, record removed", tab_id);
                }
                removed
            }
            Err(e) => {
                log::warn!("removing tab {} failed: {}", tab_id, e);
                false
            }
        }
    }

    /// Runs a keyboard command and returns the per-tab outcomes.
    pub async fn on_command(&self, command: Command) -> Vec<ToggleOutcome> {
        log::info!("command {}", command.name());
        match self.run_command(command).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                log::warn!("command {} failed: {}", command.name(), e);
                Vec::new()
            }
        }
    }

    async fn run_command(&self, command: Command) -> Result<Vec<ToggleOutcome>, MediaError> {
        match command {
            Command::PauseAll => {
                let playing = self.store.load().await?.ids_where_playing(true);
                self.playback.set_many(&playing, true).await
            }
            Command::PlayAll => {
                let paused = self.store.load().await?.ids_where_playing(false);
                self.playback.set_many(&paused, false).await
            }
            Command::ToggleCurrent => {
                let active = match self.tabs.active_tab().await? {
                    Some(tab) => tab,
                    None => return Ok(Vec::new()),
                };
                if !self.store.load().await?.contains(active.id) {
                    return Ok(Vec::new());
                }
                let outcome = self.playback.toggle(active.id, None).await?;
                Ok(vec![outcome])
            }
        }
    }
}
