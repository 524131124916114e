//! Global hotkey registration using rdev
//!
//! One background thread listens to all global key and mouse events and
//! dispatches them through a table keyed by canonical combo text. The
//! table lock is never held while a callback runs.

use rdev::{listen, Event, EventType};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, error, info, warn};

use crate::combo::{Combo, Modifiers};
use crate::ClickerError;

/// Edge of a hotkey activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyPhase {
    Pressed,
    Released,
}

/// Invoked on every press and release edge of a registered combo
pub type HotkeyCallback = Arc<dyn Fn(HotkeyPhase) + Send + Sync>;

/// OS-global hotkey registration capability
pub trait HotkeyRegistrar: Send + Sync {
    /// Register `combo`. Fails if it cannot be parsed or is already taken.
    fn register(&self, combo: &str, callback: HotkeyCallback) -> Result<(), ClickerError>;

    /// Remove `combo`. Unknown combos are ignored.
    fn unregister(&self, combo: &str);
}

struct Entry {
    combo: Combo,
    callback: HotkeyCallback,
    held: bool,
}

/// Registered combos plus the live modifier state
#[derive(Default)]
pub(crate) struct DispatchTable {
    entries: HashMap<String, Entry>,
    modifiers: Modifiers,
}

impl DispatchTable {
    fn insert(&mut self, text: &str, callback: HotkeyCallback) -> Result<(), ClickerError> {
        let combo = Combo::parse(text)?;
        let key = combo.to_string();
        if self.entries.contains_key(&key) {
            return Err(ClickerError::RegistrationFailed(format!(
                "{} is already registered",
                key
            )));
        }
        self.entries.insert(
            key,
            Entry {
                combo,
                callback,
                held: false,
            },
        );
        Ok(())
    }

    fn remove(&mut self, text: &str) -> bool {
        match Combo::parse(text) {
            Ok(combo) => self.entries.remove(&combo.to_string()).is_some(),
            Err(_) => false,
        }
    }

    /// Feed one input event; returns the callbacks to run
    pub(crate) fn handle(&mut self, event: &EventType) -> Vec<(HotkeyCallback, HotkeyPhase)> {
        let mut fired = Vec::new();
        let held = self.modifiers;

        match *event {
            EventType::KeyPress(key) => {
                self.modifiers.update(key, true);
                let mods = self.modifiers;
                for entry in self.entries.values_mut() {
                    // Auto-repeat sends repeated presses; only the first counts
                    if !entry.held && entry.combo.matches_key(key, mods) {
                        entry.held = true;
                        fired.push((entry.callback.clone(), HotkeyPhase::Pressed));
                    }
                }
            }
            EventType::KeyRelease(key) => {
                self.modifiers.update(key, false);
                for entry in self.entries.values_mut() {
                    if entry.held && entry.combo.is_trigger_key(key) {
                        entry.held = false;
                        fired.push((entry.callback.clone(), HotkeyPhase::Released));
                    }
                }
            }
            EventType::ButtonPress(button) => {
                for entry in self.entries.values_mut() {
                    if !entry.held && entry.combo.matches_button(button, held) {
                        entry.held = true;
                        fired.push((entry.callback.clone(), HotkeyPhase::Pressed));
                    }
                }
            }
            EventType::ButtonRelease(button) => {
                for entry in self.entries.values_mut() {
                    if entry.held && entry.combo.is_trigger_button(button) {
                        entry.held = false;
                        fired.push((entry.callback.clone(), HotkeyPhase::Released));
                    }
                }
            }
            _ => {}
        }

        fired
    }
}

/// Hotkey registrar backed by a global rdev listener thread
#[derive(Clone, Default)]
pub struct RdevHotkeyRegistrar {
    table: Arc<Mutex<DispatchTable>>,
    available: Arc<AtomicBool>,
}

impl RdevHotkeyRegistrar {
    /// Create a registrar. Nothing fires until [`start`](Self::start).
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DispatchTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the global listener is running
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Start listening for input events in a background thread
    ///
    /// rdev's listener never returns on success, so the thread lives until
    /// the process exits. If the listener fails (no display, missing
    /// permissions) the registrar is marked unavailable.
    pub fn start(&self) -> thread::JoinHandle<()> {
        self.available.store(true, Ordering::SeqCst);
        let table = self.table.clone();
        let available = self.available.clone();

        thread::spawn(move || {
            info!("Hotkey listener started");

            let callback = move |event: Event| {
                let fired = table
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .handle(&event.event_type);

                for (on_fire, phase) in fired {
                    debug!(?phase, "hotkey fired");
                    on_fire(phase);
                }
            };

            if let Err(e) = listen(callback) {
                error!("Error in hotkey listener: {:?}", e);
                available.store(false, Ordering::SeqCst);
            }
        })
    }
}

impl HotkeyRegistrar for RdevHotkeyRegistrar {
    fn register(&self, combo: &str, callback: HotkeyCallback) -> Result<(), ClickerError> {
        if !self.is_available() {
            return Err(ClickerError::RegistrationFailed(
                "global input listener is not running".to_string(),
            ));
        }

        match self.lock().insert(combo, callback) {
            Ok(()) => {
                info!(combo, "hotkey registered");
                Ok(())
            }
            Err(e) => {
                warn!(combo, "hotkey registration failed: {}", e);
                Err(e)
            }
        }
    }

    fn unregister(&self, combo: &str) {
        if self.lock().remove(combo) {
            info!(combo, "hotkey unregistered");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory registrar; `fire` plays the role of the OS
    #[derive(Default)]
    pub struct FakeRegistrar {
        table: Mutex<DispatchTable>,
        log: Mutex<Vec<String>>,
    }

    impl FakeRegistrar {
        /// Simulate one edge of `combo`; false if nothing is registered for it
        pub fn fire(&self, combo: &str, phase: HotkeyPhase) -> bool {
            let key = match Combo::parse(combo) {
                Ok(c) => c.to_string(),
                Err(_) => return false,
            };
            let callback = self
                .table
                .lock()
                .unwrap()
                .entries
                .get(&key)
                .map(|e| e.callback.clone());
            match callback {
                Some(callback) => {
                    callback(phase);
                    true
                }
                None => false,
            }
        }

        pub fn is_registered(&self, combo: &str) -> bool {
            Combo::parse(combo)
                .map(|c| self.table.lock().unwrap().entries.contains_key(&c.to_string()))
                .unwrap_or(false)
        }

        pub fn registered_count(&self) -> usize {
            self.table.lock().unwrap().entries.len()
        }

        /// "register X" / "unregister X" in call order
        pub fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl HotkeyRegistrar for FakeRegistrar {
        fn register(&self, combo: &str, callback: HotkeyCallback) -> Result<(), ClickerError> {
            self.log.lock().unwrap().push(format!("register {}", combo));
            self.table.lock().unwrap().insert(combo, callback)
        }

        fn unregister(&self, combo: &str) {
            self.log.lock().unwrap().push(format!("unregister {}", combo));
            self.table.lock().unwrap().remove(combo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdev::{Button, Key};

    fn recorder() -> (HotkeyCallback, Arc<Mutex<Vec<HotkeyPhase>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: HotkeyCallback = Arc::new(move |phase| sink.lock().unwrap().push(phase));
        (callback, seen)
    }

    fn run(table: &mut DispatchTable, event: EventType) {
        for (callback, phase) in table.handle(&event) {
            callback(phase);
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut table = DispatchTable::default();
        let (a, _) = recorder();
        let (b, _) = recorder();

        assert!(table.insert("F5", a).is_ok());
        assert!(matches!(
            table.insert("f5", b),
            Err(ClickerError::RegistrationFailed(_))
        ));
    }

    #[test]
    fn test_invalid_combo_rejected() {
        let mut table = DispatchTable::default();
        let (a, _) = recorder();
        assert!(matches!(
            table.insert("Ctrl+", a),
            Err(ClickerError::InvalidCombo(_))
        ));
    }

    #[test]
    fn test_press_and_release_edges() {
        let mut table = DispatchTable::default();
        let (callback, seen) = recorder();
        table.insert("Ctrl+F5", callback).unwrap();

        run(&mut table, EventType::KeyPress(Key::F5));
        assert!(seen.lock().unwrap().is_empty());

        run(&mut table, EventType::KeyRelease(Key::F5));
        run(&mut table, EventType::KeyPress(Key::ControlRight));
        run(&mut table, EventType::KeyPress(Key::F5));
        // Auto-repeat
        run(&mut table, EventType::KeyPress(Key::F5));
        run(&mut table, EventType::KeyRelease(Key::F5));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![HotkeyPhase::Pressed, HotkeyPhase::Released]
        );
    }

    #[test]
    fn test_mouse_button_combo() {
        let mut table = DispatchTable::default();
        let (callback, seen) = recorder();
        table.insert("Mouse4", callback).unwrap();

        run(&mut table, EventType::ButtonPress(Button::Left));
        run(&mut table, EventType::ButtonPress(Button::Unknown(8)));
        run(&mut table, EventType::ButtonRelease(Button::Unknown(8)));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![HotkeyPhase::Pressed, HotkeyPhase::Released]
        );
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut table = DispatchTable::default();
        let (callback, seen) = recorder();
        table.insert("F6", callback).unwrap();

        assert!(table.remove("F6"));
        assert!(!table.remove("F6"));
        assert!(!table.remove("not a combo"));

        run(&mut table, EventType::KeyPress(Key::F6));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_register_before_start_fails() {
        let registrar = RdevHotkeyRegistrar::new();
        let (callback, _) = recorder();
        assert!(!registrar.is_available());
        assert!(registrar.register("F5", callback).is_err());
    }
}
