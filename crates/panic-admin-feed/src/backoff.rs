//! Bounded exponential reconnect backoff.

use std::time::Duration;

use rand::Rng;

pub const DEFAULT_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;
pub const DEFAULT_JITTER_RATIO: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Consecutive failed connects before giving up. Zero disables reconnect.
    pub max_attempts: u32,
    pub jitter_ratio: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }
}

impl ReconnectPolicy {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    #[must_use]
    pub fn is_exhausted(&self, consecutive_failures: u32) -> bool {
        !self.is_enabled() || consecutive_failures >= self.max_attempts
    }

    /// `min(max, base * 2^n)` before jitter.
    #[must_use]
    pub fn nominal_delay(&self, consecutive_failures: u32) -> Duration {
        let factor = 1_u64.checked_shl(consecutive_failures).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Nominal delay scaled by a random factor in `[1 - jitter, 1 + jitter]`.
    #[must_use]
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        let nominal = self.nominal_delay(consecutive_failures);
        let ratio = self.jitter_ratio.clamp(0.0, 1.0);
        if ratio == 0.0 || nominal.is_zero() {
            return nominal;
        }
        let factor = rand::rng().random_range((1.0 - ratio)..=(1.0 + ratio));
        nominal.mul_f64(factor)
    }
}
