//! Media detection for a single tab.
//!
//! Shared by the background monitor (event-driven probes) and the popup
//! (manual refresh).

use std::sync::Arc;

use crate::host::{ScriptInjector, TabService};
use crate::managers::media_tab_store::MediaTabStore;
use crate::services::site_labels::normalize_domain;
use crate::types::errors::{HostError, MediaError};
use crate::types::events::TabInfo;
use crate::types::media_tab::{TabId, TabRecord};
use crate::types::page::{PageScript, ProbeResult, ScriptOutput};

/// Whether injection must not be attempted for `url`.
///
/// Compares the URL's scheme against the configured prefixes, so
/// `chrome-extension:` is covered by `chrome`. An empty URL is restricted.
pub fn is_restricted_url(url: &str, restricted_schemes: &[String]) -> bool {
    if url.trim().is_empty() {
        return true;
    }
    let scheme = url.split_once(':').map_or(url, |(scheme, _)| scheme);
    let scheme = scheme.to_ascii_lowercase();
    restricted_schemes
        .iter()
        .any(|prefix| scheme.starts_with(&prefix.to_ascii_lowercase()))
}

/// What a probe did.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Restricted page; nothing was injected.
    Skipped,
    /// The page has no loaded media. The collection is left as it was.
    NoMedia,
    /// The tab's record was upserted.
    Tracked(TabRecord),
}

/// Probes tabs for media and upserts what it finds.
#[derive(Clone)]
pub struct MediaProber {
    tabs: Arc<dyn TabService>,
    injector: Arc<dyn ScriptInjector>,
    store: MediaTabStore,
    restricted_schemes: Arc<[String]>,
}

impl MediaProber {
    pub fn new(
        tabs: Arc<dyn TabService>,
        injector: Arc<dyn ScriptInjector>,
        store: MediaTabStore,
        restricted_schemes: Vec<String>,
    ) -> Self {
        Self {
            tabs,
            injector,
            store,
            restricted_schemes: restricted_schemes.into(),
        }
    }

    pub fn is_restricted(&self, url: Option<&str>) -> bool {
        is_restricted_url(url.unwrap_or(""), &self.restricted_schemes)
    }

    /// Probes one tab and upserts its record when media is found.
    pub async fn probe_tab(&self, tab_id: TabId) -> Result<ProbeOutcome, MediaError> {
        let tab = self.tabs.get_tab(tab_id).await?;
        if self.is_restricted(tab.url.as_deref()) {
            return Ok(ProbeOutcome::Skipped);
        }

        let result = match self.injector.execute(tab_id, PageScript::ProbeMedia).await? {
            ScriptOutput::Probe(result) => result,
            _ => return Err(HostError::UnexpectedOutput("probe_media".to_string()).into()),
        };
        if !result.has_media {
            return Ok(ProbeOutcome::NoMedia);
        }

        let record = self
            .store
            .update(|tabs| {
                let mut record = detected_record(&tab, result);
                if let Some(existing) = tabs.get(tab_id) {
                    record.volume = existing.volume;
                    record.last_accessed = existing.last_accessed;
                }
                tabs.upsert(record.clone());
                record
            })
            .await?;
        log::debug!("tab {} has media (playing: {})", tab_id, record.is_playing);
        Ok(ProbeOutcome::Tracked(record))
    }

    /// Probes a tab, logging and swallowing per-tab failures.
    pub async fn probe_quietly(&self, tab_id: TabId) -> Option<ProbeOutcome> {
        match self.probe_tab(tab_id).await {
            Ok(outcome) => Some(outcome),
            Err(MediaError::Host(e)) if e.is_expected() => {
                log::debug!("probe of tab {} skipped: {}", tab_id, e);
                None
            }
            Err(e) => {
                log::warn!("probe of tab {} failed: {}", tab_id, e);
                None
            }
        }
    }
}

fn detected_record(tab: &TabInfo, result: ProbeResult) -> TabRecord {
    TabRecord {
        id: tab.id,
        title: tab.title.clone(),
        url: tab.url.clone(),
        domain: tab.url.as_deref().and_then(normalize_domain),
        fav_icon_url: tab.fav_icon_url.clone(),
        is_playing: result.is_playing,
        volume: None,
        last_accessed: None,
    }
}
