//! Arithmetic puzzle generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use std::fmt;

use stillwater_common::ChallengePrompt;

use super::{ChallengeEngine, StoredChallenge};

/// Arithmetic operator of a puzzle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
}

impl Operator {
    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
        }
    }
}

/// Operands, operator and the expected result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Puzzle {
    pub a: i64,
    pub op: Operator,
    pub b: i64,
}

impl Puzzle {
    pub fn new(a: i64, op: Operator, b: i64) -> Self {
        Self { a, op, b }
    }

    /// Random puzzle with human-scale results.
    ///
    /// Sums stay at or below 100, differences are never negative and
    /// products stay at or below 144.
    pub fn random(rng: &mut impl Rng) -> Self {
        match rng.random_range(0..3u8) {
            0 => Self::new(
                rng.random_range(1..=50),
                Operator::Add,
                rng.random_range(1..=50),
            ),
            1 => Self::new(
                rng.random_range(25..=74),
                Operator::Sub,
                rng.random_range(1..=25),
            ),
            _ => Self::new(
                rng.random_range(1..=12),
                Operator::Mul,
                rng.random_range(1..=12),
            ),
        }
    }

    pub fn answer(&self) -> i64 {
        match self.op {
            Operator::Add => self.a + self.b,
            Operator::Sub => self.a - self.b,
            Operator::Mul => self.a * self.b,
        }
    }
}

impl fmt::Display for Puzzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.a, self.op.symbol(), self.b)
    }
}

impl ChallengeEngine {
    /// Issue a new random challenge
    pub fn issue(&self) -> ChallengePrompt {
        let puzzle = Puzzle::random(&mut rand::rng());
        self.issue_puzzle(puzzle)
    }

    /// Store `puzzle` under a fresh id and return the client-facing prompt
    pub fn issue_puzzle(&self, puzzle: Puzzle) -> ChallengePrompt {
        let challenge_id = generate_challenge_id();
        let answer = puzzle.answer();
        let tag = self.signer.sign(tag_payload(&challenge_id, answer).as_bytes());

        let stored = StoredChallenge {
            created_at: self.clock.now_ms(),
            answer,
            attempts: 0,
            solved: false,
            tag,
            fingerprint: None,
        };
        self.challenges.lock().insert(challenge_id.clone(), stored);

        tracing::debug!(challenge_id = %challenge_id, "Issued challenge");

        ChallengePrompt {
            challenge_id,
            question: puzzle.to_string(),
            expires_in_secs: self.ttl.as_secs(),
        }
    }
}

/// Bytes covered by a challenge's integrity tag
pub(super) fn tag_payload(challenge_id: &str, answer: i64) -> String {
    format!("{challenge_id}:{answer}")
}

/// Generate a cryptographically random challenge ID
fn generate_challenge_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
