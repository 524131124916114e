//! Input simulation using ydotool
//!
//! Uses ydotool to send mouse events via uinput at the kernel level.
//! Works on Wayland by bypassing the display server entirely.
//! Requires ydotoold daemon to be running: sudo systemctl enable --now ydotoold

use std::process::Command;
use tracing::{debug, info};

use crate::{Action, ClickerError};

/// Trait for anything that can emit a pointer click
pub trait ClickInjector: Send + Sync {
    /// Perform one full click (press and release) of the given button
    fn click(&self, action: Action) -> Result<(), ClickerError>;
}

/// Get the ydotool socket path
fn get_socket_path() -> String {
    let uid = unsafe { libc::getuid() };
    format!("/run/user/{}/.ydotool_socket", uid)
}

/// ydotool click code for a full press+release of the button
fn click_code(action: Action) -> &'static str {
    match action {
        Action::Left => "0xC0",
        Action::Right => "0xC1",
    }
}

/// Input simulator that sends synthetic clicks via ydotool
pub struct InputSimulator {
    socket_path: String,
}

impl InputSimulator {
    /// Create a new InputSimulator
    ///
    /// Requires ydotool to be installed and ydotoold daemon running.
    pub fn new() -> Result<Self, ClickerError> {
        info!("Checking for ydotool...");

        let output = Command::new("which")
            .arg("ydotool")
            .output()
            .map_err(|e| ClickerError::InputAccess(format!("Failed to check for ydotool: {}", e)))?;

        if !output.status.success() {
            return Err(ClickerError::InputAccess(
                "ydotool not found. Install it: sudo pacman -S ydotool".to_string(),
            ));
        }

        info!("Input simulator ready");
        Ok(Self {
            socket_path: get_socket_path(),
        })
    }

    /// Run a ydotool command with the socket path set
    fn run_ydotool(&self, args: &[&str]) -> Result<(), ClickerError> {
        let output = Command::new("ydotool")
            .env("YDOTOOL_SOCKET", &self.socket_path)
            .args(args)
            .output()
            .map_err(|e| ClickerError::SendEvent(format!("Failed to run ydotool: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Permission denied") {
                return Err(ClickerError::PermissionDenied);
            }
            return Err(ClickerError::SendEvent(format!("ydotool failed: {}", stderr)));
        }

        Ok(())
    }
}

impl ClickInjector for InputSimulator {
    fn click(&self, action: Action) -> Result<(), ClickerError> {
        debug!("Sending {} click via ydotool", action);
        self.run_ydotool(&["click", click_code(action)])
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use tokio::time::Instant;

    use super::*;

    /// Records every click with the (possibly paused) tokio clock
    #[derive(Default)]
    pub struct RecordingInjector {
        clicks: Mutex<Vec<(Action, Instant)>>,
    }

    impl RecordingInjector {
        pub fn clicks(&self) -> Vec<(Action, Instant)> {
            self.clicks.lock().unwrap().clone()
        }

        pub fn count(&self, action: Action) -> usize {
            self.clicks().iter().filter(|(a, _)| *a == action).count()
        }
    }

    impl ClickInjector for RecordingInjector {
        fn click(&self, action: Action) -> Result<(), ClickerError> {
            self.clicks.lock().unwrap().push((action, Instant::now()));
            Ok(())
        }
    }

    /// Records the click on entry, then blocks the calling thread like a
    /// ydotool subprocess would
    pub struct SlowInjector {
        pub inner: RecordingInjector,
        lag: std::time::Duration,
    }

    impl SlowInjector {
        pub fn new(lag: std::time::Duration) -> Self {
            Self {
                inner: RecordingInjector::default(),
                lag,
            }
        }
    }

    impl ClickInjector for SlowInjector {
        fn click(&self, action: Action) -> Result<(), ClickerError> {
            self.inner.click(action)?;
            std::thread::sleep(self.lag);
            Ok(())
        }
    }

    /// Always fails, like a revoked uinput permission
    pub struct FailingInjector;

    impl ClickInjector for FailingInjector {
        fn click(&self, _action: Action) -> Result<(), ClickerError> {
            Err(ClickerError::PermissionDenied)
        }
    }
}
