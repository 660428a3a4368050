//! RPC method handler for the tabplay JSON-RPC harness.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested. `handle_method`
//! drives an [`App`] wired to a [`HeadlessBrowser`]: `tab.*` methods play the
//! browser's part and forward the resulting events to the background monitor,
//! `popup.*` methods act on the single open popup.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::app::App;
use crate::host::headless::{HeadlessBrowser, HeadlessPage};
use crate::host::TabService;
use crate::services::control_surface::ControlSurface;
use crate::services::media_probe::ProbeOutcome;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::events::{Command, LoadStatus, TabChangeInfo};
use crate::types::media_tab::TabId;
use crate::types::page::{MediaElement, PageControl};
use crate::types::view::PopupView;

/// How long `popup.poll` waits for a change by default.
const DEFAULT_POLL_MS: u64 = 50;

/// Everything one RPC connection drives.
pub struct Session {
    pub app: App,
    pub browser: Arc<HeadlessBrowser>,
    pub settings: SettingsEngine,
    popup: Option<ControlSurface>,
}

impl Session {
    pub fn new(app: App, browser: Arc<HeadlessBrowser>, settings: SettingsEngine) -> Self {
        Self {
            app,
            browser,
            settings,
            popup: None,
        }
    }

    fn popup(&mut self) -> Result<&mut ControlSurface, String> {
        self.popup
            .as_mut()
            .ok_or_else(|| "popup is not open".to_string())
    }
}

fn tab_id_param(params: &Value) -> Result<TabId, String> {
    params
        .get("tab_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| "missing tab_id".to_string())
}

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, String> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", name))
}

fn volume_param(params: &Value) -> Result<f32, String> {
    params
        .get("volume")
        .and_then(|v| v.as_f64())
        .map(|v| v as f32)
        .ok_or_else(|| "missing volume".to_string())
}

/// Builds a page from optional `media` and `controls` arrays.
fn page_param(params: &Value) -> Result<HeadlessPage, String> {
    let media: Vec<MediaElement> = match params.get("media") {
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| format!("invalid media: {}", e))?,
        None => Vec::new(),
    };
    let controls: Vec<PageControl> = match params.get("controls") {
        Some(v) => {
            serde_json::from_value(v.clone()).map_err(|e| format!("invalid controls: {}", e))?
        }
        None => Vec::new(),
    };
    Ok(HeadlessPage { media, controls })
}

fn probe_json(outcome: Option<ProbeOutcome>) -> Value {
    match outcome {
        Some(ProbeOutcome::Tracked(record)) => json!({"outcome": "tracked", "record": record}),
        Some(ProbeOutcome::NoMedia) => json!({"outcome": "no_media"}),
        Some(ProbeOutcome::Skipped) => json!({"outcome": "skipped"}),
        None => json!({"outcome": "failed"}),
    }
}

fn view_json(view: PopupView) -> Result<Value, String> {
    serde_json::to_value(view).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(
    session: &Mutex<Session>,
    method: &str,
    params: &Value,
) -> Result<Value, String> {
    let mut s = session.lock().await;
    match method {
        // ─── Tabs (host side) ───
        "tab.open" => {
            let url = str_param(params, "url")?;
            let title = params.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let page = page_param(params)?;
            let tab_id = s.browser.open_tab(url, title, page).map_err(|e| e.to_string())?;
            if let Some(icon) = params.get("fav_icon_url").and_then(|v| v.as_str()) {
                s.browser
                    .set_fav_icon(tab_id, Some(icon))
                    .map_err(|e| e.to_string())?;
            }
            let info = s.browser.get_tab(tab_id).await.map_err(|e| e.to_string())?;
            let probe = s.app.monitor.on_tab_created(&info).await;
            Ok(json!({"tab_id": tab_id, "probe": probe_json(probe)}))
        }
        "tab.update" => {
            let tab_id = tab_id_param(params)?;
            if let Some(url) = params.get("url").and_then(|v| v.as_str()) {
                let title = params.get("title").and_then(|v| v.as_str()).unwrap_or("");
                let page = page_param(params)?;
                s.browser
                    .navigate(tab_id, url, title, page)
                    .map_err(|e| e.to_string())?;
            } else if params.get("media").is_some() || params.get("controls").is_some() {
                let page = page_param(params)?;
                s.browser
                    .with_page(tab_id, |current| *current = page)
                    .map_err(|e| e.to_string())?;
            }
            let status = match params.get("status").and_then(|v| v.as_str()) {
                Some("complete") => Some(LoadStatus::Complete),
                Some("loading") => Some(LoadStatus::Loading),
                Some(other) => return Err(format!("invalid status: {}", other)),
                None => None,
            };
            let change = TabChangeInfo {
                audible: params.get("audible").and_then(|v| v.as_bool()),
                status,
                title: params.get("title").and_then(|v| v.as_str()).map(str::to_string),
                url: params.get("url").and_then(|v| v.as_str()).map(str::to_string),
            };
            let probed = s.app.monitor.on_tab_updated(tab_id, &change).await;
            Ok(json!({"probed": probed}))
        }
        "tab.close" => {
            let tab_id = tab_id_param(params)?;
            let existed = s.browser.close_tab(tab_id).map_err(|e| e.to_string())?;
            let removed = s.app.monitor.on_tab_removed(tab_id).await;
            Ok(json!({"closed": existed, "removed": removed}))
        }
        "tab.activate" => {
            let tab_id = tab_id_param(params)?;
            s.browser.activate(tab_id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "tab.injections" => {
            let tab_id = tab_id_param(params)?;
            Ok(json!({"count": s.browser.injection_count(tab_id)}))
        }

        // ─── Background ───
        "command" => {
            let name = str_param(params, "name")?;
            let command =
                Command::from_name(name).ok_or_else(|| format!("unknown command: {}", name))?;
            let outcomes = s.app.monitor.on_command(command).await;
            serde_json::to_value(outcomes).map_err(|e| e.to_string())
        }
        "media_tabs.list" => {
            let tabs = s.app.media_tabs.load().await.map_err(|e| e.to_string())?;
            serde_json::to_value(tabs.sorted_by_recent()).map_err(|e| e.to_string())
        }

        // ─── Popup ───
        "popup.open" => {
            let surface = s.app.open_popup().await.map_err(|e| e.to_string())?;
            let view = surface.render();
            s.popup = Some(surface);
            view_json(view)
        }
        "popup.close" => {
            let was_open = s.popup.take().is_some();
            Ok(json!({"closed": was_open}))
        }
        "popup.render" => view_json(s.popup()?.render()),
        "popup.refresh" => view_json(s.popup()?.refresh().await.map_err(|e| e.to_string())?),
        "popup.toggle" => {
            let tab_id = tab_id_param(params)?;
            view_json(s.popup()?.toggle(tab_id).await.map_err(|e| e.to_string())?)
        }
        "popup.pause_all" => view_json(s.popup()?.pause_all().await.map_err(|e| e.to_string())?),
        "popup.play_all" => view_json(s.popup()?.play_all().await.map_err(|e| e.to_string())?),
        "popup.volume_clicked" => {
            let tab_id = tab_id_param(params)?;
            let interaction = s.popup()?.volume_clicked(tab_id);
            serde_json::to_value(interaction).map_err(|e| e.to_string())
        }
        "popup.preview_volume" => {
            let volume = volume_param(params)?;
            Ok(json!({"label": s.popup()?.preview_volume(volume)}))
        }
        "popup.commit_volume" => {
            let tab_id = tab_id_param(params)?;
            let volume = volume_param(params)?;
            view_json(
                s.popup()?
                    .commit_volume(tab_id, volume)
                    .await
                    .map_err(|e| e.to_string())?,
            )
        }
        "popup.toggle_theme" => {
            view_json(s.popup()?.toggle_theme().await.map_err(|e| e.to_string())?)
        }
        "popup.poll" => {
            let wait = params
                .get("timeout_ms")
                .and_then(|v| v.as_u64())
                .unwrap_or(DEFAULT_POLL_MS);
            let popup = s.popup()?;
            match tokio::time::timeout(Duration::from_millis(wait), popup.next_change()).await {
                Ok(Some(view)) => Ok(json!({"changed": true, "view": view_json(view)?})),
                Ok(None) | Err(_) => Ok(json!({"changed": false})),
            }
        }

        // ─── License ───
        "license.get" => {
            let state = s.app.license.get().await.map_err(|e| e.to_string())?;
            serde_json::to_value(state).map_err(|e| e.to_string())
        }
        "license.has_feature" => {
            let feature = str_param(params, "feature")?;
            let allowed = s
                .app
                .license
                .has_feature(feature)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"feature": feature, "allowed": allowed}))
        }
        "license.activate" => {
            let key = str_param(params, "key")?;
            let tier = s.app.license.activate(key).await.map_err(|e| e.to_string())?;
            Ok(json!({"tier": tier}))
        }
        "license.deactivate" => {
            s.app.license.deactivate().await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Settings ───
        "settings.get" => match params.get("key").and_then(|v| v.as_str()) {
            Some(key) => s.settings.get_value(key).map_err(|e| e.to_string()),
            None => serde_json::to_value(s.settings.get_settings()).map_err(|e| e.to_string()),
        },
        "settings.set" => {
            let key = str_param(params, "key")?.to_string();
            let value = params.get("value").cloned().ok_or("missing value")?;
            s.settings.set_value(&key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "settings.reset" => {
            s.settings.reset().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
