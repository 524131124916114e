//! RapidClick - hotkey-toggled auto-clicker
//!
//! Arms the saved hotkeys (F5 = left, F6 = right by default) and clicks
//! the bound button while the hotkey is toggled on.

use rapidclick::{
    Clicker, ClickerError, Config, InputSimulator, JsonSettingsStore, RdevHotkeyRegistrar,
    Settings,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), ClickerError> {
    let config = Config::from_env();

    // Initialize logging
    let level = if config.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    info!("RapidClick starting...");

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| ClickerError::Runtime(e.to_string()))?;

    // Set up Ctrl+C handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    ctrlc::set_handler(move || {
        info!("Shutdown signal received");
        running_clone.store(false, Ordering::SeqCst);
    })
    .map_err(|e| ClickerError::Runtime(format!("Failed to set Ctrl+C handler: {}", e)))?;

    // Create input simulator
    let simulator = match InputSimulator::new() {
        Ok(sim) => sim,
        Err(ClickerError::PermissionDenied) => {
            error!("Permission denied. Please add your user to the 'input' group:");
            error!("  sudo usermod -aG input $USER");
            error!("Then logout and login again.");
            return Err(ClickerError::PermissionDenied);
        }
        Err(e) => return Err(e),
    };

    // Start the global hotkey listener
    let registrar = RdevHotkeyRegistrar::new();
    let _listener_handle = registrar.start();

    let settings = Arc::new(JsonSettingsStore::load(
        config.settings_path.clone(),
        Settings::from_config(&config),
    ));
    info!("Settings file: {}", settings.path().display());

    let clicker = Clicker::new(
        &config,
        Arc::new(simulator),
        Arc::new(registrar.clone()),
        settings,
        runtime.handle().clone(),
    )?;

    // Log every state change
    let mut events = clicker.subscribe();
    runtime.spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(%event, "click state"),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "state event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    clicker.set_listening(true);

    let saved = clicker.settings();
    info!(
        "Listening - {} toggles left clicks, {} toggles right clicks",
        saved.hotkey_left, saved.hotkey_right
    );
    info!("Press Ctrl+C to exit");

    let mut warned = false;
    while running.load(Ordering::SeqCst) {
        if !warned && !registrar.is_available() {
            warn!("Global hotkeys unavailable - check display access and 'input' group");
            warned = true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("RapidClick shutting down...");
    clicker.shutdown();
    runtime.shutdown_timeout(Duration::from_millis(500));

    Ok(())
}
