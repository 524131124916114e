//! Ties the click engine, hotkey bindings and persisted settings together

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::engine::ClickStateEvent;
use crate::hotkey_registrar::HotkeyRegistrar;
use crate::settings::{Settings, SettingsStore};
use crate::{Action, ClickEngine, ClickInjector, ClickerError, Config, HotkeyBindingStore};

/// The auto-clicker as a whole. Every mutation is applied to the core and
/// then written to the settings store.
pub struct Clicker {
    store: Arc<HotkeyBindingStore>,
    settings: Arc<dyn SettingsStore>,
}

impl Clicker {
    /// Build the core and restore persisted settings
    pub fn new(
        config: &Config,
        injector: Arc<dyn ClickInjector>,
        registrar: Arc<dyn HotkeyRegistrar>,
        settings: Arc<dyn SettingsStore>,
        runtime: Handle,
    ) -> Result<Self, ClickerError> {
        let saved = settings.get();
        let engine = ClickEngine::new(config, injector, runtime)?;

        if let Err(e) = engine.set_interval(saved.interval_ms) {
            warn!("ignoring saved interval: {}", e);
        }
        engine.set_jitter(saved.jitter);

        let store = HotkeyBindingStore::new(Arc::new(engine), registrar);
        store.set_hold_mode(saved.hold_mode);
        for action in Action::ALL {
            store.set_binding(action, saved.hotkey(action));
        }
        if saved.listening {
            store.set_listening(true);
        }

        info!(
            interval_ms = store.engine().interval_ms(),
            jitter = saved.jitter,
            left = %saved.hotkey_left,
            right = %saved.hotkey_right,
            "clicker ready"
        );

        Ok(Self { store, settings })
    }

    fn persist(&self, mut f: impl FnMut(&mut Settings)) {
        if let Err(e) = self.settings.update(&mut f) {
            warn!("failed to save settings: {}", e);
        }
    }

    pub fn engine(&self) -> &Arc<ClickEngine> {
        self.store.engine()
    }

    pub fn bindings(&self) -> &Arc<HotkeyBindingStore> {
        &self.store
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    /// Subscribe to click state changes
    pub fn subscribe(&self) -> broadcast::Receiver<ClickStateEvent> {
        self.engine().subscribe()
    }

    pub fn set_interval(&self, ms: f64) -> Result<(), ClickerError> {
        self.engine().set_interval(ms)?;
        self.persist(|s| s.interval_ms = ms);
        Ok(())
    }

    pub fn set_jitter(&self, enabled: bool) {
        self.engine().set_jitter(enabled);
        self.persist(|s| s.jitter = enabled);
    }

    pub fn set_hold_mode(&self, enabled: bool) {
        self.store.set_hold_mode(enabled);
        self.persist(|s| s.hold_mode = enabled);
    }

    /// Rebind an action; returns whether the hotkey is usable
    pub fn set_binding(&self, action: Action, combo: &str) -> bool {
        let ok = self.store.set_binding(action, combo);
        let combo = combo.trim().to_string();
        self.persist(|s| s.set_hotkey(action, combo.clone()));
        ok
    }

    pub fn set_listening(&self, enabled: bool) {
        self.store.set_listening(enabled);
        self.persist(|s| s.listening = enabled);
    }

    pub fn toggle_listening(&self) {
        let enabled = !self.engine().is_listening();
        self.set_listening(enabled);
    }

    /// Stop clicking and drop all hotkeys without touching saved settings
    pub fn shutdown(&self) {
        self.store.set_listening(false);
        info!("clicker shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey_registrar::testing::FakeRegistrar;
    use crate::hotkey_registrar::HotkeyPhase;
    use crate::input_simulator::testing::RecordingInjector;
    use crate::settings::JsonSettingsStore;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::time::sleep;

    fn create_clicker(path: &Path) -> (Clicker, Arc<FakeRegistrar>, Arc<RecordingInjector>) {
        let config = Config::default().with_settings_path(path);
        let injector = Arc::new(RecordingInjector::default());
        let registrar = Arc::new(FakeRegistrar::default());
        let settings = Arc::new(JsonSettingsStore::load(
            path,
            Settings::from_config(&config),
        ));
        let clicker = Clicker::new(
            &config,
            injector.clone(),
            registrar.clone(),
            settings,
            Handle::current(),
        )
        .unwrap();
        (clicker, registrar, injector)
    }

    #[tokio::test(start_paused = true)]
    async fn test_defaults_bound_but_disarmed() {
        let dir = tempdir().unwrap();
        let (clicker, registrar, _) = create_clicker(&dir.path().join("settings.json"));

        assert_eq!(clicker.bindings().binding(Action::Left).as_deref(), Some("F5"));
        assert_eq!(clicker.bindings().binding(Action::Right).as_deref(), Some("F6"));
        assert!(!clicker.engine().is_listening());
        assert_eq!(registrar.registered_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_are_persisted_and_restored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        {
            let (clicker, _, _) = create_clicker(&path);
            clicker.set_interval(42.0).unwrap();
            clicker.set_jitter(true);
            clicker.set_binding(Action::Left, " Ctrl+F9 ");
            clicker.set_listening(true);
            clicker.shutdown();
        }

        let (clicker, registrar, _) = create_clicker(&path);
        assert_eq!(clicker.engine().interval_ms(), 42.0);
        assert!(clicker.engine().jitter());
        assert_eq!(clicker.settings().hotkey_left, "Ctrl+F9");
        // Listening was saved as on, so hotkeys come back registered
        assert!(clicker.engine().is_listening());
        assert!(registrar.is_registered("Ctrl+F9"));
        assert!(registrar.is_registered("F6"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_interval_not_persisted() {
        let dir = tempdir().unwrap();
        let (clicker, _, _) = create_clicker(&dir.path().join("settings.json"));

        assert!(clicker.set_interval(-1.0).is_err());
        assert_eq!(clicker.settings().interval_ms, 100.0);
        assert_eq!(clicker.engine().interval_ms(), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_saved_interval_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"interval_ms": 1e25, "jitter": true}"#).unwrap();

        let (clicker, _, injector) = create_clicker(&path);
        assert_eq!(clicker.engine().interval_ms(), 100.0);
        assert!(clicker.engine().jitter());

        clicker.set_listening(true);
        clicker.engine().start(Action::Left).unwrap();
        sleep(Duration::from_millis(350)).await;
        assert!(injector.count(Action::Left) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hotkey_to_clicks_end_to_end() {
        let dir = tempdir().unwrap();
        let (clicker, registrar, injector) = create_clicker(&dir.path().join("settings.json"));
        let mut events = clicker.subscribe();
        clicker.set_listening(true);

        registrar.fire("F5", HotkeyPhase::Pressed);
        sleep(Duration::from_millis(250)).await;
        registrar.fire("F6", HotkeyPhase::Pressed);
        sleep(Duration::from_millis(150)).await;
        clicker.toggle_listening();

        assert_eq!(injector.count(Action::Left), 3);
        assert_eq!(injector.count(Action::Right), 2);
        assert!(!clicker.settings().listening);

        let received: Vec<ClickStateEvent> =
            std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert_eq!(
            received,
            vec![
                ClickStateEvent { action: Action::Left, active: true },
                ClickStateEvent { action: Action::Right, active: true },
                ClickStateEvent { action: Action::Right, active: false },
            ]
        );
    }
}
