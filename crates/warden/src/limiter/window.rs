//! Fixed windows per key (fingerprint, client address).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, millis};

/// Counter state for one key
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: i64,
    challenges_issued: u32,
}

impl WindowEntry {
    fn fresh(now: i64) -> Self {
        Self {
            count: 0,
            window_start: now,
            challenges_issued: 0,
        }
    }
}

/// Result of counting one request against a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    Allowed {
        remaining: u32,
    },
    Limited {
        challenges_issued: u32,
        retry_after_secs: u64,
    },
}

/// Keyed request counter over fixed windows that start at a key's first request
pub struct WindowCounter {
    window: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl WindowCounter {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `key` unless it already used `limit` in this window
    pub fn hit(&self, key: &str, limit: u32) -> WindowDecision {
        let now = self.clock.now_ms();
        let window = millis(self.window);
        let mut entries = self.entries.lock();

        let mut entry = entries
            .get(key)
            .copied()
            .unwrap_or_else(|| WindowEntry::fresh(now));

        if now - entry.window_start > window {
            entry = WindowEntry::fresh(now);
        }

        if entry.count >= limit {
            let remaining_ms = (window - (now - entry.window_start)).max(0) as u64;
            // Persist a reset so the next window starts cleanly
            entries.insert(key.to_string(), entry);
            return WindowDecision::Limited {
                challenges_issued: entry.challenges_issued,
                retry_after_secs: remaining_ms.div_ceil(1000).max(1),
            };
        }

        entry.count += 1;
        entries.insert(key.to_string(), entry);

        WindowDecision::Allowed {
            remaining: limit - entry.count,
        }
    }

    /// Note a challenge issued to `key` in its current window; returns the new total
    pub fn record_challenge(&self, key: &str) -> u32 {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.challenges_issued += 1;
                entry.challenges_issued
            }
            None => 0,
        }
    }

    /// Drop keys whose window started more than `idle` ago
    pub fn sweep(&self, idle: Duration) -> usize {
        let cutoff = self.clock.now_ms() - millis(idle);
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.window_start >= cutoff);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
