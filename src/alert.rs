/// Per-device alert cooldown.
///
/// A detection is aggregated every time it arrives, but the user is only
/// alerted when the same MAC has been quiet for longer than the cooldown.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::protocol::MacString;

/// Default quiet period between alerts for one device.
pub const DEFAULT_COOLDOWN_MS: u64 = 60_000;

/// Tracks the last alert time per MAC. Safe to share between threads.
#[derive(Debug)]
pub struct AlertPolicy {
    cooldown_ms: u64,
    last_alert: Mutex<HashMap<MacString, u64>>,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_MS)
    }
}

impl AlertPolicy {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last_alert: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// Whether a detection of `mac` at `now_ms` should alert, using the
    /// configured cooldown. Records `now_ms` when it returns true.
    pub fn should_alert(&self, mac: &MacString, now_ms: u64) -> bool {
        self.should_alert_with(mac, now_ms, self.cooldown_ms)
    }

    /// Like [`should_alert`](Self::should_alert) with an explicit window.
    ///
    /// Fires on the first sighting and whenever strictly more than
    /// `cooldown_ms` has elapsed since the last alert. A clock that moved
    /// backwards counts as zero elapsed.
    pub fn should_alert_with(&self, mac: &MacString, now_ms: u64, cooldown_ms: u64) -> bool {
        let mut last = self.last_alert.lock().unwrap_or_else(PoisonError::into_inner);
        let fire = match last.get(mac) {
            None => true,
            Some(&prev) => now_ms.saturating_sub(prev) > cooldown_ms,
        };
        if fire {
            last.insert(mac.clone(), now_ms);
        }
        fire
    }

    /// Forget all alert history.
    pub fn reset(&self) {
        self.last_alert
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
