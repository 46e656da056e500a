//! Challenge verification logic.

use stillwater_common::ChallengeError;

use super::generator::tag_payload;
use super::{ChallengeEngine, StoredChallenge};
use crate::clock::millis;

/// Outcome of one attempt against a stored challenge
enum Verdict {
    Solved,
    Reject(ChallengeError),
    /// Reject and delete the record
    Discard(ChallengeError),
}

impl ChallengeEngine {
    /// Verify a submitted answer and, on success, bind the solver's fingerprint.
    ///
    /// Checks run in a fixed order: existence, expiry, already solved,
    /// attempt budget, integrity, then the answer itself. The whole check
    /// and its mutation happen under one lock acquisition.
    pub fn verify(
        &self,
        challenge_id: &str,
        provided_answer: &str,
        fingerprint: &str,
    ) -> Result<(), ChallengeError> {
        let now = self.clock.now_ms();
        let mut challenges = self.challenges.lock();

        let verdict = match challenges.get_mut(challenge_id) {
            Some(challenge) => self.attempt(challenge, challenge_id, provided_answer, fingerprint, now),
            None => return Err(ChallengeError::NotFound),
        };

        match verdict {
            Verdict::Solved => {
                tracing::info!(fingerprint = %fingerprint, "Challenge solved");
                Ok(())
            }
            Verdict::Reject(err) => {
                tracing::debug!(fingerprint = %fingerprint, error = %err, "Challenge attempt rejected");
                Err(err)
            }
            Verdict::Discard(err) => {
                challenges.remove(challenge_id);
                if err == ChallengeError::Corrupted {
                    tracing::warn!("Challenge integrity check failed, record discarded");
                }
                Err(err)
            }
        }
    }

    fn attempt(
        &self,
        challenge: &mut StoredChallenge,
        challenge_id: &str,
        provided_answer: &str,
        fingerprint: &str,
        now: i64,
    ) -> Verdict {
        if now - challenge.created_at > millis(self.ttl) {
            return Verdict::Discard(ChallengeError::Expired);
        }

        if challenge.solved {
            return Verdict::Reject(ChallengeError::AlreadySolved);
        }

        challenge.attempts += 1;
        if challenge.attempts > self.max_attempts {
            return Verdict::Discard(ChallengeError::TooManyAttempts);
        }

        let payload = tag_payload(challenge_id, challenge.answer);
        if !self.signer.verify(payload.as_bytes(), &challenge.tag) {
            return Verdict::Discard(ChallengeError::Corrupted);
        }

        match provided_answer.trim().parse::<i64>() {
            Ok(answer) if answer == challenge.answer => {
                challenge.solved = true;
                challenge.fingerprint = Some(fingerprint.to_string());
                Verdict::Solved
            }
            _ => Verdict::Reject(ChallengeError::WrongAnswer {
                attempts_left: self.max_attempts - challenge.attempts,
            }),
        }
    }
}
