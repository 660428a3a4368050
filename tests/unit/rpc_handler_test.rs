//! Unit tests for the RPC handler, exercising methods through the same code
//! path as the `tabplay-rpc` binary with SQLite stores in a temp directory.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use tabplay::app::App;
use tabplay::host::headless::HeadlessBrowser;
use tabplay::rpc_handler::{handle_method, Session};
use tabplay::services::settings_engine::SettingsEngine;
use tabplay::types::settings::ExtensionSettings;

fn setup() -> (Mutex<Session>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let browser = Arc::new(HeadlessBrowser::new());
    let app = App::open(
        &tmp.path().join("data"),
        browser.clone(),
        browser.clone(),
        ExtensionSettings::default(),
    )
    .expect("Failed to init App");
    let settings_path = tmp.path().join("settings.json").to_string_lossy().to_string();
    let session = Session::new(app, browser, SettingsEngine::new(Some(settings_path)));
    (Mutex::new(session), tmp)
}

async fn call(session: &Mutex<Session>, method: &str, params: Value) -> Value {
    handle_method(session, method, &params)
        .await
        .unwrap_or_else(|e| panic!("{} failed: {}", method, e))
}

fn video(playing: bool) -> Value {
    json!([{
        "kind": "video",
        "currentSrc": "https://cdn.example/v.mp4",
        "duration": 120.0,
        "paused": !playing
    }])
}

// ─── Errors ───

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (session, _tmp) = setup();
    let res = handle_method(&session, "nonexistent.method", &json!({})).await;
    assert!(res.unwrap_err().contains("unknown method"));
}

#[tokio::test]
async fn test_missing_params_are_reported() {
    let (session, _tmp) = setup();
    let res = handle_method(&session, "tab.close", &json!({})).await;
    assert_eq!(res.unwrap_err(), "missing tab_id");
    let res = handle_method(&session, "popup.render", &json!({})).await;
    assert_eq!(res.unwrap_err(), "popup is not open");
}

// ─── Tabs ───

#[tokio::test]
async fn test_tab_open_probes_new_tab() {
    let (session, _tmp) = setup();
    let res = call(
        &session,
        "tab.open",
        json!({"url": "https://www.youtube.com/watch?v=1", "title": "Clip", "media": video(false)}),
    )
    .await;
    assert_eq!(res["probe"]["outcome"], "tracked");
    assert_eq!(res["probe"]["record"]["isPlaying"], false);
    assert_eq!(res["probe"]["record"]["domain"], "youtube.com");

    let list = call(&session, "media_tabs.list", json!({})).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_restricted_tab_is_skipped() {
    let (session, _tmp) = setup();
    let res = call(
        &session,
        "tab.open",
        json!({"url": "chrome://settings", "media": video(true)}),
    )
    .await;
    assert_eq!(res["probe"]["outcome"], "skipped");
    let tab_id = res["tab_id"].clone();

    let count = call(&session, "tab.injections", json!({"tab_id": tab_id})).await;
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn test_tab_update_and_close() {
    let (session, _tmp) = setup();
    let res = call(&session, "tab.open", json!({"url": "https://a.example/"})).await;
    let tab_id = res["tab_id"].as_i64().unwrap();
    assert_eq!(res["probe"]["outcome"], "no_media");

    let res = call(
        &session,
        "tab.update",
        json!({"tab_id": tab_id, "media": video(true), "audible": true}),
    )
    .await;
    assert_eq!(res["probed"], true);

    let res = call(&session, "tab.update", json!({"tab_id": tab_id, "status": "loading"})).await;
    assert_eq!(res["probed"], false);

    let res = call(&session, "tab.close", json!({"tab_id": tab_id})).await;
    assert_eq!(res, json!({"closed": true, "removed": true}));
    let list = call(&session, "media_tabs.list", json!({})).await;
    assert!(list.as_array().unwrap().is_empty());
}

// ─── Commands ───

#[tokio::test]
async fn test_commands() {
    let (session, _tmp) = setup();
    call(&session, "tab.open", json!({"url": "https://a.example/", "media": video(true)})).await;
    call(&session, "tab.open", json!({"url": "https://b.example/", "media": video(true)})).await;

    let res = call(&session, "command", json!({"name": "pause-all"})).await;
    let outcomes = res.as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o["state"] == "paused"));

    let res = call(&session, "command", json!({"name": "toggle-current"})).await;
    assert_eq!(res[0]["state"], "playing");

    let res = handle_method(&session, "command", &json!({"name": "rewind"})).await;
    assert!(res.unwrap_err().contains("unknown command"));
}

// ─── Popup ───

#[tokio::test]
async fn test_popup_flow() {
    let (session, _tmp) = setup();
    let res = call(
        &session,
        "tab.open",
        json!({"url": "https://music.youtube.com/watch", "title": "Song", "media": video(true)}),
    )
    .await;
    let tab_id = res["tab_id"].as_i64().unwrap();

    let view = call(&session, "popup.open", json!({})).await;
    assert_eq!(view["list"]["layout"], "flat");
    assert_eq!(view["list"]["rows"][0]["action_label"], "Pause");
    assert_eq!(view["list"]["rows"][0]["volume"]["state"], "locked");

    let view = call(&session, "popup.toggle", json!({"tab_id": tab_id})).await;
    assert_eq!(view["list"]["rows"][0]["status"], "paused");

    let res = call(&session, "popup.volume_clicked", json!({"tab_id": tab_id})).await;
    assert_eq!(res, json!("upgrade_prompt"));
    let res = handle_method(
        &session,
        "popup.commit_volume",
        &json!({"tab_id": tab_id, "volume": 0.5}),
    )
    .await;
    assert!(res.unwrap_err().contains("Upgrade required"));

    call(&session, "license.activate", json!({"key": "TPC-PREM-KEY"})).await;
    // The toggle's own write may be delivered first.
    let mut tier = Value::Null;
    for _ in 0..4 {
        let polled = call(&session, "popup.poll", json!({"timeout_ms": 500})).await;
        if polled["changed"] == true {
            tier = polled["view"]["tier"].clone();
            if tier == "premium" {
                break;
            }
        }
    }
    assert_eq!(tier, "premium");

    let view = call(
        &session,
        "popup.commit_volume",
        json!({"tab_id": tab_id, "volume": 0.5}),
    )
    .await;
    assert_eq!(view["list"]["rows"][0]["volume"]["label"], "50%");

    let res = call(&session, "popup.preview_volume", json!({"volume": 0.75})).await;
    assert_eq!(res["label"], "75%");

    let view = call(&session, "popup.toggle_theme", json!({})).await;
    assert_eq!(view["theme"], "dark");

    let res = call(&session, "popup.close", json!({})).await;
    assert_eq!(res["closed"], true);
}

#[tokio::test]
async fn test_popup_poll_without_changes() {
    let (session, _tmp) = setup();
    call(&session, "popup.open", json!({})).await;
    let polled = call(&session, "popup.poll", json!({"timeout_ms": 10})).await;
    assert_eq!(polled, json!({"changed": false}));
}

// ─── License ───

#[tokio::test]
async fn test_license_methods() {
    let (session, _tmp) = setup();
    let state = call(&session, "license.get", json!({})).await;
    assert_eq!(state["tier"], "free");

    let res = handle_method(&session, "license.activate", &json!({"key": "bogus"})).await;
    assert_eq!(res.unwrap_err(), "Invalid license key");

    let res = call(&session, "license.activate", json!({"key": "TPC-PRO-1"})).await;
    assert_eq!(res["tier"], "pro");
    let res = call(&session, "license.has_feature", json!({"feature": "focusScheduler"})).await;
    assert_eq!(res["allowed"], true);

    call(&session, "license.deactivate", json!({})).await;
    let res = call(&session, "license.has_feature", json!({"feature": "focusScheduler"})).await;
    assert_eq!(res["allowed"], false);
}

// ─── Settings ───

#[tokio::test]
async fn test_settings_methods() {
    let (session, _tmp) = setup();
    let all = call(&session, "settings.get", json!({})).await;
    assert_eq!(all["popup"]["default_icon"], "icons/icon16.png");

    call(
        &session,
        "settings.set",
        json!({"key": "popup.group_by_domain", "value": false}),
    )
    .await;
    let value = call(&session, "settings.get", json!({"key": "popup.group_by_domain"})).await;
    assert_eq!(value, json!(false));

    let res = handle_method(
        &session,
        "settings.set",
        &json!({"key": "popup.nope", "value": 1}),
    )
    .await;
    assert!(res.is_err());

    call(&session, "settings.reset", json!({})).await;
    let value = call(&session, "settings.get", json!({"key": "popup.group_by_domain"})).await;
    assert_eq!(value, json!(true));
}
