use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between the last input event and the connection probe.
pub const DEFAULT_PROBE_DEBOUNCE_MS: u64 = 800;
/// Accepted debounce range.
pub const PROBE_DEBOUNCE_RANGE_MS: (u64, u64) = (500, 1500);
/// Default deadline of one connection probe.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
/// Default quiet period after a repaint before change detection resumes.
pub const DEFAULT_SETTLE_MS: u64 = 300;
/// Default delay between the last edit and an automatic save.
pub const DEFAULT_AUTO_SAVE_MS: u64 = 1500;
/// API keys shorter than this are not worth probing.
pub const DEFAULT_MIN_API_KEY_LEN: usize = 20;

/// Timing and plausibility settings of the editor engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub probe_debounce_ms: u64,
    pub probe_timeout_secs: u64,
    pub settle_ms: u64,
    pub auto_save_ms: u64,
    pub min_api_key_len: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            probe_debounce_ms: DEFAULT_PROBE_DEBOUNCE_MS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            settle_ms: DEFAULT_SETTLE_MS,
            auto_save_ms: DEFAULT_AUTO_SAVE_MS,
            min_api_key_len: DEFAULT_MIN_API_KEY_LEN,
        }
    }
}

impl EditorConfig {
    /// Probe debounce, clamped into the accepted range.
    #[must_use]
    pub fn probe_debounce(&self) -> Duration {
        let (lo, hi) = PROBE_DEBOUNCE_RANGE_MS;
        Duration::from_millis(self.probe_debounce_ms.clamp(lo, hi))
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    #[must_use]
    pub fn auto_save_delay(&self) -> Duration {
        Duration::from_millis(self.auto_save_ms)
    }
}
