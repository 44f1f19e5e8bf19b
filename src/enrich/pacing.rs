//! Per-domain politeness gate.
//!
//! Each host has a "next allowed start" instant. A worker reserves its slot
//! under the single lock (so reservations from concurrent workers serialize),
//! releases the lock, then sleeps until the reserved instant.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct DomainPacer {
    interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl DomainPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next start slot for `domain` and return it.
    pub fn reserve(&self, domain: &str) -> Instant {
        let now = Instant::now();
        let mut slots = self
            .next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = match slots.get(domain) {
            Some(next) if *next > now => *next,
            _ => now,
        };
        slots.insert(domain.to_string(), slot + self.interval);
        slot
    }

    /// Wait until this caller may start a request to `domain`.
    pub async fn wait_turn(&self, domain: &str) {
        if self.interval.is_zero() {
            return;
        }
        let slot = self.reserve(domain);
        tokio::time::sleep_until(slot).await;
    }
}

/// Lowercased host of `url` without a leading `www.`.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}
