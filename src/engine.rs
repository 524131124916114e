//! The click loop
//!
//! A self-rescheduling one-shot timer chain running on a tokio runtime.
//! Every `start`/`stop` bumps a generation counter; a pending tick whose
//! captured generation is stale discards itself, so at most one chain is
//! ever live. The tick checks its generation and reads the button under the
//! same lock that `start` and `stop` take; the click itself runs outside it
//! so `stop` never waits on the injector.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{Action, ClickInjector, ClickerError, Config};

/// Lower bound for any delay between two clicks
pub const MIN_DELAY_MS: f64 = 1.0;

/// Largest accepted interval (about 49.7 days)
pub const MAX_INTERVAL_MS: f64 = u32::MAX as f64;

/// Upper bound for any delay, leaving room for full jitter on the largest interval
pub const MAX_DELAY_MS: f64 = MAX_INTERVAL_MS * 2.0;

/// Emitted whenever the engine's active/button state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickStateEvent {
    pub action: Action,
    pub active: bool,
}

impl std::fmt::Display for ClickStateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.active { "ACTIVE" } else { "INACTIVE" };
        write!(f, "{} {}", self.action.to_string().to_uppercase(), state)
    }
}

#[derive(Debug)]
struct EngineState {
    active: bool,
    listening: bool,
    button: Action,
    interval_ms: f64,
    jitter: bool,
    generation: u64,
}

struct Shared {
    state: Mutex<EngineState>,
    injector: Arc<dyn ClickInjector>,
    events: broadcast::Sender<ClickStateEvent>,
    jitter_ratio: f64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, state: &EngineState) {
        let event = ClickStateEvent {
            action: state.button,
            active: state.active,
        };
        debug!(%event, "emitting state event");
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Cancel any chain and mark inactive. Caller holds the lock.
    fn stop_locked(&self, state: &mut EngineState) {
        state.generation += 1;
        state.active = false;
        self.emit(state);
    }

    /// Check the chain is still current and read what to fire
    fn begin_tick(&self, generation: u64) -> Option<(Action, Duration)> {
        let state = self.lock();
        if state.generation != generation || !state.active {
            return None;
        }

        let delay = next_delay(
            state.interval_ms,
            state.jitter,
            self.jitter_ratio,
            &mut rand::thread_rng(),
        );
        Some((state.button, delay))
    }

    /// Fire one click without holding the state lock. The injector may
    /// block (ydotool spawns a process), so on a multi-threaded runtime the
    /// worker is handed off first.
    fn fire(&self, button: Action) {
        let click = || self.injector.click(button);
        let result = match Handle::current().runtime_flavor() {
            RuntimeFlavor::MultiThread => tokio::task::block_in_place(click),
            _ => click(),
        };
        if let Err(e) = result {
            warn!(%button, "click failed: {}", e);
        }
    }
}

async fn run_chain(shared: Arc<Shared>, generation: u64) {
    debug!(generation, "click chain started");
    while let Some((button, delay)) = shared.begin_tick(generation) {
        // Deadline is measured from the tick, not from when the click returns
        let deadline = Instant::now() + delay;
        shared.fire(button);
        tokio::time::sleep_until(deadline).await;
    }
    debug!(generation, "click chain ended");
}

/// Compute the delay before the next click.
///
/// With jitter the delay is drawn uniformly from
/// `interval ± interval * ratio`, independently per call. The result is
/// clamped to `[MIN_DELAY_MS, MAX_DELAY_MS]`.
pub fn next_delay<R: Rng>(
    interval_ms: f64,
    jitter: bool,
    ratio: f64,
    rng: &mut R,
) -> Duration {
    let mut ms = interval_ms;
    if jitter && ratio > 0.0 {
        let spread = interval_ms * ratio;
        if spread.is_finite() {
            ms += rng.gen_range(-spread..=spread);
        }
    }
    let ms = if ms.is_nan() {
        MIN_DELAY_MS
    } else {
        ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS)
    };
    Duration::from_micros((ms * 1000.0).round() as u64)
}

fn validate_interval(ms: f64) -> Result<f64, ClickerError> {
    if ms.is_finite() && ms > 0.0 && ms <= MAX_INTERVAL_MS {
        Ok(ms)
    } else {
        Err(ClickerError::InvalidInterval(ms))
    }
}

/// Owns the click loop, its interval, jitter policy and active button
pub struct ClickEngine {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl ClickEngine {
    /// Create an idle, disarmed engine whose timer chain runs on `runtime`
    pub fn new(
        config: &Config,
        injector: Arc<dyn ClickInjector>,
        runtime: Handle,
    ) -> Result<Self, ClickerError> {
        let interval_ms = validate_interval(config.interval_ms)?;
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState {
                    active: false,
                    listening: false,
                    button: Action::Left,
                    interval_ms,
                    jitter: config.jitter,
                    generation: 0,
                }),
                injector,
                events,
                jitter_ratio: config.jitter_ratio,
            }),
            runtime,
        })
    }

    /// Arm or disarm the engine. Disarming stops any running loop.
    pub fn set_listening(&self, enabled: bool) {
        let mut state = self.shared.lock();
        if !enabled {
            self.shared.stop_locked(&mut state);
        }
        state.listening = enabled;
        info!(listening = enabled, "listening changed");
    }

    /// Start clicking `button`, replacing any running loop
    pub fn start(&self, button: Action) -> Result<(), ClickerError> {
        let generation = {
            let mut state = self.shared.lock();
            if !state.listening {
                debug!(%button, "start refused, not listening");
                return Err(ClickerError::NotListening);
            }
            state.generation += 1;
            state.button = button;
            state.active = true;
            self.shared.emit(&state);
            state.generation
        };

        info!(%button, generation, "click loop started");
        self.runtime.spawn(run_chain(self.shared.clone(), generation));
        Ok(())
    }

    /// Stop the loop. Always emits so observers converge.
    pub fn stop(&self) {
        let mut state = self.shared.lock();
        let was_active = state.active;
        self.shared.stop_locked(&mut state);
        if was_active {
            info!(button = %state.button, "click loop stopped");
        }
    }

    /// Change the base interval, effective from the next tick
    pub fn set_interval(&self, ms: f64) -> Result<(), ClickerError> {
        let ms = validate_interval(ms)?;
        self.shared.lock().interval_ms = ms;
        debug!(interval_ms = ms, "interval changed");
        Ok(())
    }

    /// Change the jitter policy, effective from the next tick
    pub fn set_jitter(&self, enabled: bool) {
        self.shared.lock().jitter = enabled;
        debug!(jitter = enabled, "jitter changed");
    }

    pub fn is_active(&self) -> bool {
        self.shared.lock().active
    }

    pub fn is_listening(&self) -> bool {
        self.shared.lock().listening
    }

    pub fn current_button(&self) -> Action {
        self.shared.lock().button
    }

    pub fn interval_ms(&self) -> f64 {
        self.shared.lock().interval_ms
    }

    pub fn jitter(&self) -> bool {
        self.shared.lock().jitter
    }

    /// Subscribe to state-change events
    pub fn subscribe(&self) -> broadcast::Receiver<ClickStateEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for ClickEngine {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.generation += 1;
        state.active = false;
        state.listening = false;
    }
}
