//! RapidClick - hotkey-toggled auto-clicker
//!
//! This library provides components for:
//! - A cancellable, jitterable click loop (`engine`)
//! - Hotkey bindings routed into the click loop (`bindings`)
//! - Global hotkey registration (`hotkey_registrar`)
//! - Input simulation (sending synthetic clicks)
//! - Persisted settings and the controller tying it all together

pub mod action;
pub mod bindings;
pub mod combo;
pub mod config;
pub mod controller;
pub mod engine;
pub mod hotkey_registrar;
pub mod input_simulator;
pub mod settings;

pub use action::Action;
pub use bindings::HotkeyBindingStore;
pub use combo::Combo;
pub use config::Config;
pub use controller::Clicker;
pub use engine::{ClickEngine, ClickStateEvent};
pub use hotkey_registrar::{HotkeyCallback, HotkeyPhase, HotkeyRegistrar, RdevHotkeyRegistrar};
pub use input_simulator::{ClickInjector, InputSimulator};
pub use settings::{JsonSettingsStore, Settings, SettingsStore};

use thiserror::Error;

/// Main error type for RapidClick
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClickerError {
    #[error("Click loop cannot start while not listening")]
    NotListening,

    #[error("Invalid click interval: {0}ms (must be positive and at most u32::MAX)")]
    InvalidInterval(f64),

    #[error("Failed to register hotkey: {0}")]
    RegistrationFailed(String),

    #[error("Invalid hotkey combination: {0}")]
    InvalidCombo(String),

    #[error("Failed to access input devices: {0}")]
    InputAccess(String),

    #[error("Failed to send input event: {0}")]
    SendEvent(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Failed to start runtime: {0}")]
    Runtime(String),

    #[error("Permission denied - add user to 'input' group")]
    PermissionDenied,
}
