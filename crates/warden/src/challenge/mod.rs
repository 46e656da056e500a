//! Math challenge issuance and verification.
//!
//! A challenge moves from `Issued` to exactly one of `Solved`, `Expired`,
//! `Exhausted` or `Corrupted`. Every state other than `Solved` deletes the
//! record; solved records stay until their TTL so they can act as a bypass.

mod generator;
mod verifier;

pub use generator::{Operator, Puzzle};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, millis};
use crate::config::ChallengeConfig;
use crate::signing::Signer;

/// Stored challenge state
#[derive(Debug, Clone)]
pub(crate) struct StoredChallenge {
    pub created_at: i64,
    pub answer: i64,
    pub attempts: u32,
    pub solved: bool,
    /// HMAC over `id:answer`
    pub tag: String,
    /// Fingerprint that solved the challenge
    pub fingerprint: Option<String>,
}

/// Challenge engine service
pub struct ChallengeEngine {
    signer: Signer,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_attempts: u32,
    challenges: Mutex<HashMap<String, StoredChallenge>>,
}

impl ChallengeEngine {
    pub fn new(config: &ChallengeConfig, signer: Signer, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            clock,
            ttl: config.ttl(),
            max_attempts: config.max_attempts,
            challenges: Mutex::new(HashMap::new()),
        }
    }

    /// Does `fingerprint` hold a solved, unexpired challenge?
    pub fn has_bypass(&self, fingerprint: &str) -> bool {
        let now = self.clock.now_ms();
        let ttl = millis(self.ttl);
        self.challenges.lock().values().any(|c| {
            c.solved && c.fingerprint.as_deref() == Some(fingerprint) && now - c.created_at < ttl
        })
    }

    /// Remove expired challenges; returns how many were dropped
    pub fn sweep(&self) -> usize {
        let cutoff = self.clock.now_ms() - millis(self.ttl);
        let mut challenges = self.challenges.lock();
        let before = challenges.len();
        challenges.retain(|_, c| c.created_at >= cutoff);
        before - challenges.len()
    }

    /// Number of stored challenges
    pub fn len(&self) -> usize {
        self.challenges.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::signing::tests::TEST_SECRET;

    pub(crate) fn engine(clock: Arc<ManualClock>) -> ChallengeEngine {
        let signer = Signer::new("CHALLENGE_SECRET", TEST_SECRET).unwrap();
        ChallengeEngine::new(&ChallengeConfig::default(), signer, clock)
    }

    #[test]
    fn test_issue_stores_challenge() {
        let clock = Arc::new(ManualClock::default());
        let engine = engine(clock);
        let prompt = engine.issue();
        assert_eq!(prompt.expires_in_secs, 300);
        assert_eq!(engine.len(), 1);
        assert!(engine.challenges.lock().contains_key(&prompt.challenge_id));
    }

    #[test]
    fn test_bypass_requires_solved_matching_live_challenge() {
        let clock = Arc::new(ManualClock::default());
        let engine = engine(clock.clone());
        let prompt = engine.issue_puzzle(Puzzle::new(3, Operator::Mul, 4));

        assert!(!engine.has_bypass("abc123"));
        engine.verify(&prompt.challenge_id, "12", "abc123").unwrap();
        assert!(engine.has_bypass("abc123"));
        assert!(!engine.has_bypass("other"));

        clock.advance(Duration::from_secs(300));
        assert!(!engine.has_bypass("abc123"));
    }

    #[test]
    fn test_sweep_drops_expired() {
        let clock = Arc::new(ManualClock::default());
        let engine = engine(clock.clone());
        engine.issue();
        clock.advance(Duration::from_secs(200));
        engine.issue();

        clock.advance(Duration::from_secs(101));
        assert_eq!(engine.sweep(), 1);
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.sweep(), 0);
    }
}
