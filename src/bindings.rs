//! Hotkey bindings for the two click actions
//!
//! Owns the combo text per action, keeps the OS registrations in step with
//! the engine's listening state, and routes hotkey activations into the
//! engine. This is the only caller of `ClickEngine::start`/`stop`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

use crate::hotkey_registrar::{HotkeyCallback, HotkeyPhase, HotkeyRegistrar};
use crate::{Action, ClickEngine};

#[derive(Debug, Default)]
struct BindingState {
    bindings: [Option<String>; 2],
    registered: [bool; 2],
    active: [bool; 2],
    hold_mode: bool,
}

/// Maps recorded combos to click actions
pub struct HotkeyBindingStore {
    engine: Arc<ClickEngine>,
    registrar: Arc<dyn HotkeyRegistrar>,
    state: Mutex<BindingState>,
    this: Weak<HotkeyBindingStore>,
}

impl HotkeyBindingStore {
    /// Create a store with no bindings
    pub fn new(engine: Arc<ClickEngine>, registrar: Arc<dyn HotkeyRegistrar>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            engine,
            registrar,
            state: Mutex::new(BindingState::default()),
            this: this.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BindingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn engine(&self) -> &Arc<ClickEngine> {
        &self.engine
    }

    /// Bind `combo` to `action`.
    ///
    /// While listening the previous combo is unregistered and the new one
    /// registered; the return value is whether the OS accepted it. While
    /// not listening the text is only stored and `true` is returned.
    /// Empty text clears the binding.
    pub fn set_binding(&self, action: Action, combo: &str) -> bool {
        let mut state = self.lock();
        let i = action.index();
        let listening = self.engine.is_listening();

        if listening && state.registered[i] {
            if let Some(previous) = &state.bindings[i] {
                self.registrar.unregister(previous);
            }
        }

        let combo = combo.trim();
        state.bindings[i] = (!combo.is_empty()).then(|| combo.to_string());
        state.registered[i] = false;
        info!(%action, combo, "binding updated");

        if !listening || state.bindings[i].is_none() {
            return true;
        }
        self.register_locked(&mut state, action)
    }

    /// Arm or disarm hotkeys and the click loop together
    pub fn set_listening(&self, enabled: bool) {
        let mut state = self.lock();

        if enabled {
            if self.engine.is_listening() {
                return;
            }
            self.engine.set_listening(true);
            for action in Action::ALL {
                if state.bindings[action.index()].is_some() {
                    self.register_locked(&mut state, action);
                }
            }
        } else {
            self.engine.set_listening(false);
            for action in Action::ALL {
                let i = action.index();
                if state.registered[i] {
                    if let Some(combo) = &state.bindings[i] {
                        self.registrar.unregister(combo);
                    }
                    state.registered[i] = false;
                }
            }
        }

        self.sync_flags(&mut state);
    }

    /// Switch between toggle mode and hold-to-click mode
    pub fn set_hold_mode(&self, enabled: bool) {
        self.lock().hold_mode = enabled;
        debug!(hold_mode = enabled, "hold mode changed");
    }

    /// Toggle-on-same, switch-on-different
    pub fn on_hotkey_fired(&self, action: Action) {
        let mut state = self.lock();

        if self.engine.current_button() == action && self.engine.is_active() {
            self.engine.stop();
        } else if let Err(e) = self.engine.start(action) {
            debug!(%action, "hotkey ignored: {}", e);
        }

        self.sync_flags(&mut state);
    }

    /// Entry point for registrar callbacks
    pub fn on_hotkey_event(&self, action: Action, phase: HotkeyPhase) {
        let hold_mode = self.lock().hold_mode;

        match (hold_mode, phase) {
            (false, HotkeyPhase::Pressed) => self.on_hotkey_fired(action),
            (false, HotkeyPhase::Released) => {}
            (true, HotkeyPhase::Pressed) => {
                let mut state = self.lock();
                if let Err(e) = self.engine.start(action) {
                    debug!(%action, "hotkey ignored: {}", e);
                }
                self.sync_flags(&mut state);
            }
            (true, HotkeyPhase::Released) => {
                let mut state = self.lock();
                // Another action may have taken over while this key was held
                if self.engine.current_button() == action && self.engine.is_active() {
                    self.engine.stop();
                }
                self.sync_flags(&mut state);
            }
        }
    }

    pub fn binding(&self, action: Action) -> Option<String> {
        self.lock().bindings[action.index()].clone()
    }

    pub fn is_registered(&self, action: Action) -> bool {
        self.lock().registered[action.index()]
    }

    pub fn active_flag(&self, action: Action) -> bool {
        self.lock().active[action.index()]
    }

    pub fn hold_mode(&self) -> bool {
        self.lock().hold_mode
    }

    fn register_locked(&self, state: &mut BindingState, action: Action) -> bool {
        let i = action.index();
        let Some(combo) = state.bindings[i].clone() else {
            return false;
        };

        let this = self.this.clone();
        let callback: HotkeyCallback = Arc::new(move |phase| {
            if let Some(store) = this.upgrade() {
                store.on_hotkey_event(action, phase);
            }
        });

        let ok = match self.registrar.register(&combo, callback) {
            Ok(()) => true,
            Err(e) => {
                warn!(%action, %combo, "hotkey not registered: {}", e);
                false
            }
        };
        state.registered[i] = ok;
        ok
    }

    fn sync_flags(&self, state: &mut BindingState) {
        let active = self.engine.is_active();
        let button = self.engine.current_button();
        for action in Action::ALL {
            state.active[action.index()] = active && button == action;
        }
    }
}
