//! Sliding-window rate limiter (§4.2).
//!
//! Guarded by an internal lock; cleanup of expired entries is lazy and
//! happens inline on every `check` call, so there is no background thread
//! and no unbounded memory growth (§5).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_ms: u64,
}

struct KeyState {
    timestamps: Vec<u64>,
}

/// Per-key sliding-window limiter: at most `max` events per `window_ms`.
pub struct RateLimiter {
    max: u32,
    window_ms: u64,
    state: Mutex<HashMap<String, KeyState>>,
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
}

impl RateLimiter {
    pub fn new(max: u32, window_ms: u64) -> Self {
        Self {
            max,
            window_ms,
            state: Mutex::new(HashMap::new()),
            clock: Box::new(now_ms),
        }
    }

    /// Construct with an injectable clock, for deterministic tests.
    pub fn with_clock(max: u32, window_ms: u64, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self {
            max,
            window_ms,
            state: Mutex::new(HashMap::new()),
            clock: Box::new(clock),
        }
    }

    /// Check (and, if allowed, record) one event for `key`.
    pub fn check(&self, key: &str) -> CheckResult {
        let now = (self.clock)();
        let mut guard = self.state.lock().expect("rate limiter mutex poisoned");
        let entry = guard.entry(key.to_string()).or_insert_with(|| KeyState { timestamps: Vec::new() });

        let cutoff = now.saturating_sub(self.window_ms);
        entry.timestamps.retain(|&t| t > cutoff);

        if (entry.timestamps.len() as u32) < self.max {
            entry.timestamps.push(now);
            let remaining = self.max - entry.timestamps.len() as u32;
            CheckResult { allowed: true, remaining, reset_ms: 0 }
        } else {
            let oldest = *entry.timestamps.first().unwrap_or(&now);
            let reset_ms = (oldest + self.window_ms).saturating_sub(now);
            CheckResult { allowed: false, remaining: 0, reset_ms }
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
