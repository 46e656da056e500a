//! Process-wide request budget over a trailing window of one-second slots.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, millis};

/// Result of a global budget check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalDecision {
    Allowed,
    Rejected { retry_after_secs: u64 },
}

/// Global counter keyed by one-second slot start (ms)
pub struct GlobalCounter {
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    slots: Mutex<BTreeMap<i64, u32>>,
}

impl GlobalCounter {
    pub fn new(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window,
            clock,
            slots: Mutex::new(BTreeMap::new()),
        }
    }

    /// Accept and count the request unless the trailing window is full
    pub fn check(&self) -> GlobalDecision {
        let now = self.clock.now_ms();
        let window = millis(self.window);
        let window_start = now - window;

        let mut slots = self.slots.lock();
        // Slots before the window can never count again
        *slots = slots.split_off(&window_start);

        let in_window: u64 = slots.values().map(|c| u64::from(*c)).sum();
        if in_window >= u64::from(self.limit) {
            let reset_ms = (window - now.rem_euclid(window)) as u64;
            return GlobalDecision::Rejected {
                retry_after_secs: reset_ms.div_ceil(1000).max(1),
            };
        }

        let slot = now - now.rem_euclid(1000);
        *slots.entry(slot).or_insert(0) += 1;
        GlobalDecision::Allowed
    }

    /// Requests counted in the trailing window
    pub fn in_window(&self) -> u64 {
        let window_start = self.clock.now_ms() - millis(self.window);
        self.slots
            .lock()
            .range(window_start..)
            .map(|(_, c)| u64::from(*c))
            .sum()
    }

    /// Drop slots older than the window
    pub fn sweep(&self) -> usize {
        let window_start = self.clock.now_ms() - millis(self.window);
        let mut slots = self.slots.lock();
        let before = slots.len();
        *slots = slots.split_off(&window_start);
        before - slots.len()
    }
}
