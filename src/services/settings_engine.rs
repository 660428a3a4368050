// tabplay Settings Engine
// Loads, saves, updates and resets ExtensionSettings, stored as pretty JSON
// at the platform config path.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::ExtensionSettings;

/// Settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<ExtensionSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ExtensionSettings;
    fn get_value(&self, key: &str) -> Result<Value, SettingsError>;
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine backed by a JSON file.
pub struct SettingsEngine {
    config_path: String,
    settings: ExtensionSettings,
}

impl SettingsEngine {
    /// Uses `path_override` if given, otherwise `settings.json` in the
    /// platform config directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override.unwrap_or_else(|| {
            platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string()
        });

        Self {
            config_path,
            settings: ExtensionSettings::default(),
        }
    }

    fn to_json(&self) -> Result<Value, SettingsError> {
        serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })
    }
}

/// Turns `popup.default_icon` into the JSON pointer `/popup/default_icon`.
fn key_to_pointer(key: &str) -> Result<String, SettingsError> {
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(SettingsError::InvalidKey(format!(
            "Malformed settings key '{}'",
            key
        )));
    }
    Ok(key.split('.').fold(String::new(), |mut pointer, part| {
        pointer.push('/');
        pointer.push_str(part);
        pointer
    }))
}

/// Rejects values that deserialize fine but cannot work at runtime.
fn validate(settings: &ExtensionSettings) -> Result<(), SettingsError> {
    if settings.storage.cas_max_retries == 0 {
        return Err(SettingsError::InvalidValue(
            "storage.cas_max_retries must be at least 1".to_string(),
        ));
    }
    if settings
        .monitor
        .restricted_schemes
        .iter()
        .any(|scheme| scheme.trim().is_empty())
    {
        return Err(SettingsError::InvalidValue(
            "monitor.restricted_schemes cannot contain empty entries".to_string(),
        ));
    }
    Ok(())
}

impl SettingsEngineTrait for SettingsEngine {
    /// Missing file means defaults; a malformed file is an error.
    fn load(&mut self) -> Result<ExtensionSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            log::debug!("no settings at {}, using defaults", self.config_path);
            self.settings = ExtensionSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: ExtensionSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        validate(&settings)?;

        self.settings = settings;
        Ok(self.settings.clone())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &ExtensionSettings {
        &self.settings
    }

    fn get_value(&self, key: &str) -> Result<Value, SettingsError> {
        let pointer = key_to_pointer(key)?;
        self.to_json()?
            .pointer(&pointer)
            .cloned()
            .ok_or_else(|| SettingsError::InvalidKey(format!("Key '{}' not found in settings", key)))
    }

    /// Updates one setting by dot-notation path and saves.
    ///
    /// - `"popup.group_by_domain"` → `settings.popup.group_by_domain`
    /// - `"storage.cas_max_retries"` → `settings.storage.cas_max_retries`
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let pointer = key_to_pointer(key)?;
        let mut json = self.to_json()?;

        match json.pointer_mut(&pointer) {
            Some(slot) => *slot = value,
            None => {
                return Err(SettingsError::InvalidKey(format!(
                    "Key '{}' not found in settings",
                    key
                )))
            }
        }

        let updated: ExtensionSettings = serde_json::from_value(json).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        validate(&updated)?;

        self.settings = updated;
        self.save()?;
        log::info!("setting {} updated", key);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = ExtensionSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
