//! Tests for the JSON-backed settings engine.

use std::fs;

use serde_json::json;
use tempfile::TempDir;

use tabplay::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tabplay::types::errors::SettingsError;
use tabplay::types::page::ResumeStrategy;
use tabplay::types::settings::ExtensionSettings;

fn engine_in(tmp: &TempDir) -> SettingsEngine {
    let path = tmp.path().join("settings.json").to_string_lossy().to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_file() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine_in(&tmp);
    assert_eq!(engine.load().unwrap(), ExtensionSettings::default());
}

#[test]
fn test_default_values() {
    let defaults = ExtensionSettings::default();
    assert_eq!(
        defaults.monitor.restricted_schemes,
        vec!["chrome", "edge", "about", "devtools", "view-source"]
    );
    assert!(defaults.monitor.probe_on_create);
    assert_eq!(defaults.playback.resume_strategies, ResumeStrategy::defaults());
    assert_eq!(defaults.popup.default_icon, "icons/icon16.png");
    assert!(defaults.popup.group_by_domain);
    assert_eq!(defaults.storage.cas_max_retries, 8);
}

#[test]
fn test_set_value_persists_across_engines() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine_in(&tmp);
    engine.load().unwrap();
    engine
        .set_value("popup.group_by_domain", json!(false))
        .unwrap();

    let mut reloaded = engine_in(&tmp);
    assert!(!reloaded.load().unwrap().popup.group_by_domain);
}

#[test]
fn test_set_value_replaces_lists() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine_in(&tmp);
    engine
        .set_value(
            "playback.resume_strategies",
            json!([{"kind": "click_control", "name": "spotify", "selector": "[data-testid=\"control-button-playpause\"]"}]),
        )
        .unwrap();
    assert_eq!(
        engine.get_settings().playback.resume_strategies,
        vec![ResumeStrategy::click(
            "spotify",
            "[data-testid=\"control-button-playpause\"]"
        )]
    );
}

#[test]
fn test_get_value() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_in(&tmp);
    assert_eq!(engine.get_value("storage.cas_max_retries").unwrap(), json!(8));
    assert!(matches!(
        engine.get_value("storage.nope"),
        Err(SettingsError::InvalidKey(_))
    ));
}

#[test]
fn test_set_value_invalid_key() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine_in(&tmp);
    assert!(matches!(
        engine.set_value("nonexistent.key", json!(true)),
        Err(SettingsError::InvalidKey(_))
    ));
    assert!(matches!(
        engine.set_value("", json!(true)),
        Err(SettingsError::InvalidKey(_))
    ));
}

#[test]
fn test_set_value_wrong_type_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine_in(&tmp);
    let result = engine.set_value("monitor.probe_on_create", json!("yes"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    assert!(engine.get_settings().monitor.probe_on_create);
}

#[test]
fn test_zero_retries_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine_in(&tmp);
    let result = engine.set_value("storage.cas_max_retries", json!(0));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    assert_eq!(engine.get_settings().storage.cas_max_retries, 8);
}

#[test]
fn test_reset_restores_defaults() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine_in(&tmp);
    engine.set_value("popup.default_icon", json!("icons/alt.png")).unwrap();
    engine.reset().unwrap();
    assert_eq!(*engine.get_settings(), ExtensionSettings::default());

    let mut reloaded = engine_in(&tmp);
    assert_eq!(reloaded.load().unwrap(), ExtensionSettings::default());
}

#[test]
fn test_load_malformed_json() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("settings.json"), "{ invalid json }").unwrap();
    let mut engine = engine_in(&tmp);
    assert!(matches!(
        engine.load(),
        Err(SettingsError::SerializationError(_))
    ));
}

#[test]
fn test_save_creates_parent_directories() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("dir").join("settings.json");
    let mut engine = SettingsEngine::new(Some(path.to_string_lossy().to_string()));
    engine.set_value("monitor.probe_on_create", json!(false)).unwrap();
    assert!(path.exists());
}
