//! Configuration management for RapidClick

use std::path::PathBuf;

/// Environment variable that overrides the settings file location
pub const SETTINGS_PATH_ENV: &str = "RAPIDCLICK_CONFIG";

/// Environment variable that enables debug logging when set to 1/true
pub const VERBOSE_ENV: &str = "RAPIDCLICK_VERBOSE";

/// Configuration for the auto-clicker
#[derive(Debug, Clone)]
pub struct Config {
    /// Base delay in milliseconds between clicks
    pub interval_ms: f64,

    /// Perturb each delay by a random amount
    pub jitter: bool,

    /// Maximum jitter as a fraction of the interval (0.1 = ±10%)
    pub jitter_ratio: f64,

    /// Default combo for the left-click action
    pub hotkey_left: String,

    /// Default combo for the right-click action
    pub hotkey_right: String,

    /// Where persisted settings live
    pub settings_path: PathBuf,

    /// Capacity of the state-event broadcast channel
    pub event_capacity: usize,

    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: 100.0,
            jitter: false,
            jitter_ratio: 0.1,
            hotkey_left: String::from("F5"),
            hotkey_right: String::from("F6"),
            settings_path: default_settings_path(),
            event_capacity: 64,
            verbose: false,
        }
    }
}

impl Config {
    /// Build a Config from defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(SETTINGS_PATH_ENV) {
            config = config.with_settings_path(path);
        }
        if let Ok(value) = std::env::var(VERBOSE_ENV) {
            config = config.with_verbose(matches!(value.as_str(), "1" | "true" | "yes"));
        }
        config
    }

    /// Set the base click interval
    pub fn with_interval(mut self, interval_ms: f64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the jitter ratio, clamped to [0, 1)
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio.clamp(0.0, 0.99);
        self
    }

    /// Set the default combos for both actions
    pub fn with_hotkeys(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.hotkey_left = left.into();
        self.hotkey_right = right.into();
        self
    }

    /// Use a custom settings file
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = path.into();
        self
    }

    /// Enable verbose logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rapidclick")
        .join("settings.json")
}
