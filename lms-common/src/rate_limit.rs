//! Fixed-window rate limiter
//!
//! Caps how many audits a single caller (IP, user id, API key) may start per
//! window. Windows are tracked per key; an exhausted window reports how long
//! the caller must wait before the next attempt.

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// Per-key fixed-window request counter
pub struct WindowLimiter<C: Clock = SystemClock> {
    windows: Mutex<HashMap<String, WindowEntry>>,
    clock: C,
}

impl WindowLimiter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for WindowLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> WindowLimiter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Record one request for `key`, limited to `limit` per `window`
    ///
    /// Returns `Error::RateLimited` with the remaining wait once the window
    /// budget is spent.
    pub fn check(&self, key: &str, limit: u32, window: Duration) -> Result<()> {
        let now = self.clock.now();
        let mut windows = self.lock();

        match windows.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if now > entry.reset_at {
                    // Previous window elapsed; start a fresh one
                    *entry = WindowEntry {
                        count: 1,
                        reset_at: now + window,
                    };
                    return Ok(());
                }
                if entry.count >= limit {
                    let retry_after_secs = entry
                        .reset_at
                        .duration_since(now)
                        .as_secs_f64()
                        .ceil() as u64;
                    tracing::warn!(key = %key, limit, "Rate limit exceeded");
                    return Err(Error::RateLimited { retry_after_secs });
                }
                entry.count += 1;
                Ok(())
            }
            Entry::Vacant(slot) => {
                slot.insert(WindowEntry {
                    count: 1,
                    reset_at: now + window,
                });
                Ok(())
            }
        }
    }

    /// Drop windows that have already reset
    pub fn cleanup(&self) {
        let now = self.clock.now();
        let mut windows = self.lock();
        windows.retain(|_, entry| entry.reset_at > now);
    }

    /// Number of tracked keys, including any not yet swept
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, WindowEntry>> {
        self.windows.lock().unwrap_or_else(|e| e.into_inner())
    }
}
