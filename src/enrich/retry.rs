//! Exponential backoff with bounded jitter for transient fetch failures.
//!
//! Delay before retry `k` (1-based) is `base * 2^(k-1) + jitter`, where jitter is
//! drawn from `[0, min(max_jitter, base * 2^(k-1)))`. Capping the jitter by the
//! exponential term keeps successive delays non-decreasing.

use rand::Rng;
use std::time::Duration;

use crate::config::EnrichConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &EnrichConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base: cfg.backoff_base(),
            max_jitter: cfg.backoff_jitter(),
        }
    }

    /// Total network calls allowed for one item.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Deterministic part of the delay before retry `k`.
    pub fn exponential(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        self.base.saturating_mul(1u32 << shift)
    }

    /// Full delay (exponential + jitter) before retry `k`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.exponential(retry);
        let cap = exp.min(self.max_jitter);
        let cap_ms = cap.as_millis() as u64;
        let jitter = if cap_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..cap_ms))
        };
        exp + jitter
    }
}
