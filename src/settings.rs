//! Persisted user settings
//!
//! A single JSON record read once at startup and rewritten on every change.
//! Observers can subscribe to changes through a watch channel.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{Action, ClickerError, Config};

/// Everything the user can change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub interval_ms: f64,
    pub jitter: bool,
    pub hotkey_left: String,
    pub hotkey_right: String,
    pub listening: bool,
    pub hold_mode: bool,
}

impl Settings {
    /// Defaults taken from the config
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval_ms: config.interval_ms,
            jitter: config.jitter,
            hotkey_left: config.hotkey_left.clone(),
            hotkey_right: config.hotkey_right.clone(),
            listening: false,
            hold_mode: false,
        }
    }

    pub fn hotkey(&self, action: Action) -> &str {
        match action {
            Action::Left => &self.hotkey_left,
            Action::Right => &self.hotkey_right,
        }
    }

    pub fn set_hotkey(&mut self, action: Action, combo: impl Into<String>) {
        match action {
            Action::Left => self.hotkey_left = combo.into(),
            Action::Right => self.hotkey_right = combo.into(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Get/set/subscribe access to the settings record
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> Settings;

    fn set(&self, settings: Settings) -> Result<(), ClickerError>;

    fn subscribe(&self) -> watch::Receiver<Settings>;

    /// Apply `f` to the current record and persist the result
    fn update(&self, f: &mut dyn FnMut(&mut Settings)) -> Result<(), ClickerError> {
        let mut settings = self.get();
        f(&mut settings);
        self.set(settings)
    }
}

/// Settings stored as pretty-printed JSON on disk
pub struct JsonSettingsStore {
    path: PathBuf,
    tx: watch::Sender<Settings>,
}

impl JsonSettingsStore {
    /// Load from `path`, falling back to `defaults` if missing or unreadable
    pub fn load(path: impl Into<PathBuf>, defaults: Settings) -> Self {
        let path = path.into();
        let settings = match Self::read(&path) {
            Ok(Some(settings)) => {
                info!(path = %path.display(), "settings loaded");
                settings
            }
            Ok(None) => {
                debug!(path = %path.display(), "no settings file, using defaults");
                defaults
            }
            Err(e) => {
                warn!(path = %path.display(), "ignoring unreadable settings: {}", e);
                defaults
            }
        };

        let (tx, _) = watch::channel(settings);
        Self { path, tx }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<Option<Settings>, ClickerError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .map_err(|e| ClickerError::Settings(format!("Failed to read settings: {}", e)))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ClickerError::Settings(format!("Invalid settings file: {}", e)))
    }

    fn write(&self, settings: &Settings) -> Result<(), ClickerError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                ClickerError::Settings(format!("Failed to create settings directory: {}", e))
            })?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| ClickerError::Settings(format!("Failed to encode settings: {}", e)))?;
        fs::write(&self.path, json)
            .map_err(|e| ClickerError::Settings(format!("Failed to write settings: {}", e)))
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self) -> Settings {
        self.tx.borrow().clone()
    }

    fn set(&self, settings: Settings) -> Result<(), ClickerError> {
        let result = self.write(&settings);
        // Observers see the change even if the disk write failed
        self.tx.send_replace(settings);
        result
    }

    fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }
}
