//! Playback Controller for tabplay.
//!
//! Injects playback and volume scripts into tabs and reconciles the shared
//! records with what the page reported.

use std::sync::Arc;

use serde::Serialize;

use crate::host::ScriptInjector;
use crate::managers::media_tab_store::MediaTabStore;
use crate::types::errors::{HostError, MediaError};
use crate::types::media_tab::TabId;
use crate::types::page::{PageScript, PlaybackState, ResumeStrategy, ScriptOutput};

/// Epoch milliseconds.
fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Result of toggling one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub tab_id: TabId,
    pub state: PlaybackState,
}

/// Sends playback and volume commands to tabs.
#[derive(Clone)]
pub struct PlaybackController {
    injector: Arc<dyn ScriptInjector>,
    store: MediaTabStore,
    strategies: Arc<[ResumeStrategy]>,
}

impl PlaybackController {
    pub fn new(
        injector: Arc<dyn ScriptInjector>,
        store: MediaTabStore,
        strategies: Vec<ResumeStrategy>,
    ) -> Self {
        Self {
            injector,
            store,
            strategies: strategies.into(),
        }
    }

    /// Runs the playback script without touching storage.
    pub async fn apply(&self, tab_id: TabId, pause: bool) -> Result<PlaybackState, HostError> {
        let script = PageScript::SetPlayback {
            pause,
            strategies: self.strategies.to_vec(),
        };
        match self.injector.execute(tab_id, script).await? {
            ScriptOutput::Playback { state } => Ok(state),
            _ => Err(HostError::UnexpectedOutput("set_playback".to_string())),
        }
    }

    /// Pauses (`Some(true)`), resumes (`Some(false)`) or flips (`None`) a tracked tab.
    pub async fn toggle(
        &self,
        tab_id: TabId,
        desired_pause: Option<bool>,
    ) -> Result<ToggleOutcome, MediaError> {
        let tabs = self.store.load().await?;
        let record = tabs.get(tab_id).ok_or(MediaError::NotTracked(tab_id))?;
        let pause = desired_pause.unwrap_or(record.is_playing);

        let state = self.apply(tab_id, pause).await?;
        let outcome = ToggleOutcome { tab_id, state };
        self.record_outcomes(&[outcome]).await?;
        Ok(outcome)
    }

    /// Sets the same playback state on several tabs, one after another, and
    /// persists all results in a single update.
    ///
    /// Tabs that fail are logged and left out of the result.
    pub async fn set_many(
        &self,
        tab_ids: &[TabId],
        pause: bool,
    ) -> Result<Vec<ToggleOutcome>, MediaError> {
        let mut outcomes = Vec::with_capacity(tab_ids.len());
        for &tab_id in tab_ids {
            match self.apply(tab_id, pause).await {
                Ok(state) => outcomes.push(ToggleOutcome { tab_id, state }),
                Err(e) if e.is_expected() => {
                    log::debug!("skipping tab {}: {}", tab_id, e);
                }
                Err(e) => {
                    log::warn!("toggling tab {} failed: {}", tab_id, e);
                }
            }
        }
        self.record_outcomes(&outcomes).await?;
        Ok(outcomes)
    }

    /// Writes observed states back. `Unknown` keeps the last-known value.
    async fn record_outcomes(&self, outcomes: &[ToggleOutcome]) -> Result<(), MediaError> {
        if outcomes.is_empty() {
            return Ok(());
        }
        let now = now_millis();
        self.store
            .update(|tabs| {
                for outcome in outcomes {
                    if let Some(record) = tabs.get_mut(outcome.tab_id) {
                        match outcome.state.is_playing() {
                            Some(playing) => record.is_playing = playing,
                            None => log::warn!(
                                "tab {} playback unconfirmed, keeping last-known state",
                                outcome.tab_id
                            ),
                        }
                        record.last_accessed = Some(now);
                    }
                }
            })
            .await?;
        Ok(())
    }

    /// Pushes a volume to a tracked tab and stores it on the record.
    pub async fn set_volume(&self, tab_id: TabId, volume: f32) -> Result<f32, MediaError> {
        let volume = volume.clamp(0.0, 1.0);
        if !self.store.load().await?.contains(tab_id) {
            return Err(MediaError::NotTracked(tab_id));
        }

        match self
            .injector
            .execute(tab_id, PageScript::SetVolume { volume })
            .await?
        {
            ScriptOutput::Volume { applied } => {
                log::debug!("volume {:.2} applied to {} element(s) in tab {}", volume, applied, tab_id);
            }
            _ => return Err(HostError::UnexpectedOutput("set_volume".to_string()).into()),
        }

        let now = now_millis();
        self.store
            .update(|tabs| {
                if let Some(record) = tabs.get_mut(tab_id) {
                    record.volume = Some(volume);
                    record.last_accessed = Some(now);
                }
            })
            .await?;
        Ok(volume)
    }
}
