//! Headless browser host.
//!
//! Keeps tabs and their pages in memory and runs injected scripts through the
//! shared page-side code. Enforces the same contract as a real host: injection
//! into restricted schemes or closed tabs fails with an error.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ScriptInjector, TabService};
use crate::page::{self, PageDocument};
use crate::services::media_probe::is_restricted_url;
use crate::types::errors::HostError;
use crate::types::events::TabInfo;
use crate::types::media_tab::TabId;
use crate::types::page::{ControlAction, MediaElement, PageControl, PageScript, ScriptOutput};
use crate::types::settings::MonitorSettings;

/// DOM model of a headless tab.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeadlessPage {
    #[serde(default)]
    pub media: Vec<MediaElement>,
    #[serde(default)]
    pub controls: Vec<PageControl>,
}

impl HeadlessPage {
    pub fn with_media(media: Vec<MediaElement>) -> Self {
        Self {
            media,
            controls: Vec::new(),
        }
    }

    pub fn control(mut self, selector: &str, action: ControlAction) -> Self {
        self.controls.push(PageControl {
            selector: selector.to_string(),
            action,
        });
        self
    }
}

impl PageDocument for HeadlessPage {
    fn media_elements(&self) -> &[MediaElement] {
        &self.media
    }

    fn media_elements_mut(&mut self) -> &mut [MediaElement] {
        &mut self.media
    }

    fn click(&mut self, selector: &str) -> bool {
        let action = match self.controls.iter().find(|c| c.selector == selector) {
            Some(control) => control.action,
            None => return false,
        };
        if action == ControlAction::ResumeMedia {
            // The site's player drives its own element, so autoplay blocking does not apply.
            for media in self.media.iter_mut().filter(|m| m.has_content()) {
                media.paused = false;
            }
        }
        true
    }
}

struct HeadlessTab {
    info: TabInfo,
    page: HeadlessPage,
    injections: usize,
}

struct BrowserState {
    tabs: BTreeMap<TabId, HeadlessTab>,
    active: Option<TabId>,
    next_id: TabId,
}

impl BrowserState {
    fn info(&self, tab: &HeadlessTab) -> TabInfo {
        TabInfo {
            active: self.active == Some(tab.info.id),
            ..tab.info.clone()
        }
    }
}

/// In-memory browser implementing both host services.
pub struct HeadlessBrowser {
    state: Mutex<BrowserState>,
    restricted_schemes: Vec<String>,
}

impl HeadlessBrowser {
    pub fn new() -> Self {
        Self::with_restricted_schemes(MonitorSettings::default().restricted_schemes)
    }

    pub fn with_restricted_schemes(restricted_schemes: Vec<String>) -> Self {
        Self {
            state: Mutex::new(BrowserState {
                tabs: BTreeMap::new(),
                active: None,
                next_id: 1,
            }),
            restricted_schemes,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BrowserState>, HostError> {
        self.state
            .lock()
            .map_err(|_| HostError::Injection("headless browser lock poisoned".to_string()))
    }

    /// Opens a tab, makes it active and returns its id.
    pub fn open_tab(&self, url: &str, title: &str, page: HeadlessPage) -> Result<TabId, HostError> {
        let mut state = self.lock()?;
        let id = state.next_id;
        state.next_id += 1;
        state.tabs.insert(
            id,
            HeadlessTab {
                info: TabInfo {
                    id,
                    url: Some(url.to_string()),
                    title: title.to_string(),
                    fav_icon_url: None,
                    active: false,
                },
                page,
                injections: 0,
            },
        );
        state.active = Some(id);
        Ok(id)
    }

    /// Closes a tab. Returns whether it existed.
    pub fn close_tab(&self, tab_id: TabId) -> Result<bool, HostError> {
        let mut state = self.lock()?;
        let existed = state.tabs.remove(&tab_id).is_some();
        if state.active == Some(tab_id) {
            let fallback = state.tabs.keys().next_back().copied();
            state.active = fallback;
        }
        Ok(existed)
    }

    pub fn activate(&self, tab_id: TabId) -> Result<(), HostError> {
        let mut state = self.lock()?;
        if !state.tabs.contains_key(&tab_id) {
            return Err(HostError::TabClosed(tab_id));
        }
        state.active = Some(tab_id);
        Ok(())
    }

    /// Loads a new document into an existing tab.
    pub fn navigate(
        &self,
        tab_id: TabId,
        url: &str,
        title: &str,
        page: HeadlessPage,
    ) -> Result<(), HostError> {
        let mut state = self.lock()?;
        let tab = state.tabs.get_mut(&tab_id).ok_or(HostError::TabClosed(tab_id))?;
        tab.info.url = Some(url.to_string());
        tab.info.title = title.to_string();
        tab.page = page;
        Ok(())
    }

    pub fn set_fav_icon(&self, tab_id: TabId, icon: Option<&str>) -> Result<(), HostError> {
        let mut state = self.lock()?;
        let tab = state.tabs.get_mut(&tab_id).ok_or(HostError::TabClosed(tab_id))?;
        tab.info.fav_icon_url = icon.map(str::to_string);
        Ok(())
    }

    /// Mutates a tab's page in place, as page-initiated activity would.
    pub fn with_page<R>(
        &self,
        tab_id: TabId,
        f: impl FnOnce(&mut HeadlessPage) -> R,
    ) -> Result<R, HostError> {
        let mut state = self.lock()?;
        let tab = state.tabs.get_mut(&tab_id).ok_or(HostError::TabClosed(tab_id))?;
        Ok(f(&mut tab.page))
    }

    /// Injection attempts against a tab so far, including refused ones (0 for unknown tabs).
    pub fn injection_count(&self, tab_id: TabId) -> usize {
        self.lock()
            .ok()
            .and_then(|state| state.tabs.get(&tab_id).map(|t| t.injections))
            .unwrap_or(0)
    }
}

impl Default for HeadlessBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabService for HeadlessBrowser {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        let state = self.lock()?;
        let tab = state.tabs.get(&tab_id).ok_or(HostError::TabClosed(tab_id))?;
        Ok(state.info(tab))
    }

    async fn query_tabs(&self) -> Result<Vec<TabInfo>, HostError> {
        let state = self.lock()?;
        Ok(state.tabs.values().map(|t| state.info(t)).collect())
    }

    async fn active_tab(&self) -> Result<Option<TabInfo>, HostError> {
        let state = self.lock()?;
        Ok(state
            .active
            .and_then(|id| state.tabs.get(&id))
            .map(|t| state.info(t)))
    }
}

#[async_trait]
impl ScriptInjector for HeadlessBrowser {
    async fn execute(&self, tab_id: TabId, script: PageScript) -> Result<ScriptOutput, HostError> {
        let mut state = self.lock()?;
        let tab = state.tabs.get_mut(&tab_id).ok_or(HostError::TabClosed(tab_id))?;
        tab.injections += 1;
        let url = tab.info.url.clone().unwrap_or_default();
        if is_restricted_url(&url, &self.restricted_schemes) {
            return Err(HostError::RestrictedPage(url));
        }
        Ok(page::run_script(&mut tab.page, &script))
    }
}
