//! Session-scoped context threaded through the loop, dispatcher and search

use courtbot_core::{CancelToken, GameState, InputInjector, Key, StateKey, StateValue};
use courtbot_cv::{Detect, Detection};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Pauses between inputs and polls, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Control loop cadence
    pub tick_interval_ms: u64,
    /// Settle after a menu key press
    pub key_settle_ms: u64,
    /// Settle between repeated scroll presses
    pub scroll_settle_ms: u64,
    /// Settle after each left, up or right carousel step
    pub probe_settle_ms: u64,
    /// Settle after each downward carousel step
    pub descend_settle_ms: u64,
    /// Extra pause before the match prologue when a downward step found the marker
    pub descend_found_settle_ms: u64,
    /// Settle after each escalation key
    pub escalation_settle_ms: u64,
    /// Pause after a failed search iteration
    pub search_idle_ms: u64,
    /// Pause when the post-match loop sees nothing
    pub post_match_idle_ms: u64,
    /// Wait for a full screen transition
    pub screen_change_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            key_settle_ms: 1000,
            scroll_settle_ms: 500,
            probe_settle_ms: 300,
            descend_settle_ms: 500,
            descend_found_settle_ms: 1000,
            escalation_settle_ms: 500,
            search_idle_ms: 500,
            post_match_idle_ms: 500,
            screen_change_ms: 3000,
        }
    }
}

impl Timings {
    /// No waiting at all; for tests and offline replays.
    pub fn instant() -> Self {
        Self {
            tick_interval_ms: 0,
            key_settle_ms: 0,
            scroll_settle_ms: 0,
            probe_settle_ms: 0,
            descend_settle_ms: 0,
            descend_found_settle_ms: 0,
            escalation_settle_ms: 0,
            search_idle_ms: 0,
            post_match_idle_ms: 0,
            screen_change_ms: 0,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn key_settle(&self) -> Duration {
        Duration::from_millis(self.key_settle_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn probe_settle(&self) -> Duration {
        Duration::from_millis(self.probe_settle_ms)
    }

    pub fn descend_settle(&self) -> Duration {
        Duration::from_millis(self.descend_settle_ms)
    }

    pub fn descend_found_settle(&self) -> Duration {
        Duration::from_millis(self.descend_found_settle_ms)
    }

    pub fn escalation_settle(&self) -> Duration {
        Duration::from_millis(self.escalation_settle_ms)
    }

    pub fn search_idle(&self) -> Duration {
        Duration::from_millis(self.search_idle_ms)
    }

    pub fn post_match_idle(&self) -> Duration {
        Duration::from_millis(self.post_match_idle_ms)
    }

    pub fn screen_change(&self) -> Duration {
        Duration::from_millis(self.screen_change_ms)
    }
}

/// Everything one running session owns
pub struct Session {
    detector: Box<dyn Detect>,
    input: Box<dyn InputInjector>,
    state: GameState,
    timings: Timings,
    cancel: CancelToken,
}

impl Session {
    pub fn new(
        detector: impl Detect + 'static,
        input: impl InputInjector + 'static,
        timings: Timings,
        cancel: CancelToken,
    ) -> Self {
        Self {
            detector: Box::new(detector),
            input: Box::new(input),
            state: GameState::new(),
            timings,
            cancel,
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_running()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Set a navigation flag. Rejected writes are logged by the state.
    pub fn set_flag(&mut self, key: StateKey, value: bool) {
        let _ = self.state.set(key, StateValue::Flag(value));
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Look for `label` on a fresh frame. A stopped session looks at nothing.
    pub fn detect(&mut self, label: &str, threshold: Option<f64>) -> Detection {
        if !self.is_running() {
            return Detection::Unavailable("session stopped".to_string());
        }
        self.detector.detect(label, threshold)
    }

    pub fn sees(&mut self, label: &str, threshold: Option<f64>) -> bool {
        self.detect(label, threshold).is_hit()
    }

    /// Press `key`, then wait `settle`. Returns whether the session is
    /// still running afterwards. Injection failures are logged only.
    pub fn press(&mut self, key: Key, settle: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        if let Err(e) = self.input.press(key) {
            warn!("Key press '{}' failed: {}", key, e);
        }
        self.wait(settle)
    }

    /// Press `key` `times` times with `settle` after each.
    pub fn press_repeated(&mut self, key: Key, times: u32, settle: Duration) -> bool {
        for _ in 0..times {
            if !self.press(key, settle) {
                return false;
            }
        }
        self.is_running()
    }

    pub fn wait(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.is_running();
        }
        self.cancel.sleep(duration)
    }
}
