//! Rate limiting: a global budget plus a budget per fingerprint.
//!
//! The limiter only counts. Escalation (bypass check, challenge issuance,
//! hard block) and the suspicion-adjusted limit are gatekeeper policy.

mod global;
mod window;

pub use global::{GlobalCounter, GlobalDecision};
pub use window::{WindowCounter, WindowDecision};

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::RateLimitConfig;

/// Result of a per-fingerprint check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintDecision {
    Allowed,
    Throttled {
        /// A challenge may still be offered in this window
        needs_challenge: bool,
        retry_after_secs: u64,
    },
}

/// Rate limiter service
pub struct RateLimiter {
    config: RateLimitConfig,
    global: GlobalCounter,
    fingerprints: WindowCounter,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let window = config.window();
        Self {
            global: GlobalCounter::new(config.global_limit, window, clock.clone()),
            fingerprints: WindowCounter::new(window, clock),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request against the global budget
    pub fn check_global(&self) -> GlobalDecision {
        self.global.check()
    }

    /// Count a request against `fingerprint` using the caller-chosen `limit`
    pub fn check_fingerprint(&self, fingerprint: &str, limit: u32) -> FingerprintDecision {
        match self.fingerprints.hit(fingerprint, limit) {
            WindowDecision::Allowed { .. } => FingerprintDecision::Allowed,
            WindowDecision::Limited {
                challenges_issued,
                retry_after_secs,
            } => FingerprintDecision::Throttled {
                needs_challenge: challenges_issued < self.config.max_challenges_per_window,
                retry_after_secs,
            },
        }
    }

    /// Record that a challenge was issued to `fingerprint` in its current window
    pub fn record_challenge(&self, fingerprint: &str) -> u32 {
        self.fingerprints.record_challenge(fingerprint)
    }

    /// Purge global slots outside the window and fingerprints idle for two windows
    pub fn sweep(&self) -> usize {
        let idle: Duration = self.config.window() * 2;
        self.global.sweep() + self.fingerprints.sweep(idle)
    }

    pub fn global_in_window(&self) -> u64 {
        self.global.in_window()
    }

    pub fn tracked_fingerprints(&self) -> usize {
        self.fingerprints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(clock: Arc<ManualClock>) -> RateLimiter {
        RateLimiter::new(RateLimitConfig::default(), clock)
    }

    #[test]
    fn test_sixth_request_needs_challenge() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock.clone());

        for _ in 0..5 {
            assert_eq!(
                limiter.check_fingerprint("abc123", 5),
                FingerprintDecision::Allowed
            );
            clock.advance(Duration::from_secs(2));
        }

        match limiter.check_fingerprint("abc123", 5) {
            FingerprintDecision::Throttled {
                needs_challenge,
                retry_after_secs,
            } => {
                assert!(needs_challenge);
                assert_eq!(retry_after_secs, 50);
            }
            other => panic!("expected throttle, got {other:?}"),
        }
    }

    #[test]
    fn test_hard_block_after_three_challenges() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock.clone());
        for _ in 0..5 {
            limiter.check_fingerprint("fp", 5);
        }

        for issued in 1..=3 {
            assert!(matches!(
                limiter.check_fingerprint("fp", 5),
                FingerprintDecision::Throttled {
                    needs_challenge: true,
                    ..
                }
            ));
            assert_eq!(limiter.record_challenge("fp"), issued);
        }

        assert!(matches!(
            limiter.check_fingerprint("fp", 5),
            FingerprintDecision::Throttled {
                needs_challenge: false,
                ..
            }
        ));

        // A new window clears both the count and the challenge tally
        clock.advance(Duration::from_secs(61));
        assert_eq!(limiter.check_fingerprint("fp", 5), FingerprintDecision::Allowed);
    }

    #[test]
    fn test_exact_limit_succeeds_for_any_limit() {
        for limit in 1..=8 {
            let clock = Arc::new(ManualClock::default());
            let limiter = limiter(clock.clone());
            for _ in 0..limit {
                assert_eq!(
                    limiter.check_fingerprint("fp", limit),
                    FingerprintDecision::Allowed
                );
            }
            assert!(matches!(
                limiter.check_fingerprint("fp", limit),
                FingerprintDecision::Throttled { .. }
            ));
            clock.advance(Duration::from_secs(61));
            assert_eq!(
                limiter.check_fingerprint("fp", limit),
                FingerprintDecision::Allowed
            );
        }
    }

    #[test]
    fn test_sweep_purges_idle_fingerprints() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock.clone());
        limiter.check_global();
        limiter.check_fingerprint("fp", 5);
        assert_eq!(limiter.tracked_fingerprints(), 1);

        clock.advance(Duration::from_secs(121));
        assert_eq!(limiter.sweep(), 2);
        assert_eq!(limiter.tracked_fingerprints(), 0);
        assert_eq!(limiter.global_in_window(), 0);
    }
}
