//! Common error types for Stillwater components.

use thiserror::Error;

use crate::types::ChallengePrompt;

/// Reasons a challenge verification can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    #[error("Challenge not found or expired")]
    NotFound,

    #[error("Challenge expired")]
    Expired,

    #[error("Challenge already solved")]
    AlreadySolved,

    #[error("Too many attempts")]
    TooManyAttempts,

    #[error("Challenge corrupted")]
    Corrupted,

    #[error("Incorrect answer")]
    WrongAnswer { attempts_left: u32 },
}

impl ChallengeError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "challenge_not_found",
            Self::Expired => "challenge_expired",
            Self::AlreadySolved => "challenge_already_solved",
            Self::TooManyAttempts => "challenge_too_many_attempts",
            Self::Corrupted => "challenge_corrupted",
            Self::WrongAnswer { .. } => "challenge_wrong_answer",
        }
    }
}

/// Common errors across Stillwater components
#[derive(Debug, Error)]
pub enum StillwaterError {
    /// Missing or weak configuration; fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad, oversized or empty input
    #[error("{0}")]
    Validation(String),

    /// Host header not on the allow-list
    #[error("Invalid host header")]
    InvalidHost,

    /// Message rejected by the entropy heuristic
    #[error("Message content appears automated or invalid")]
    AutomatedContent,

    /// Global or per-fingerprint budget exhausted
    #[error("Rate limit exceeded")]
    RateLimited {
        retry_after_secs: u64,
        challenge: Option<ChallengePrompt>,
    },

    /// Challenge verification failed
    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    /// Record does not exist
    #[error("Not found")]
    NotFound,

    /// Record aged out (and was removed)
    #[error("Record has expired")]
    Expired,

    /// Record failed its integrity check (and was removed)
    #[error("Invalid or tampered record")]
    Tampered,

    /// External collaborator failed; detail is never surfaced
    #[error("Service temporarily unavailable")]
    UpstreamUnavailable,

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StillwaterError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Validation(_) => 400,
            Self::InvalidHost => 400,
            Self::AutomatedContent => 400,
            Self::RateLimited { .. } => 429,
            Self::Challenge(ChallengeError::NotFound) => 404,
            Self::Challenge(_) => 400,
            Self::NotFound => 404,
            Self::Expired => 404,
            Self::Tampered => 400,
            Self::UpstreamUnavailable => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::Validation(_) => "validation_error",
            Self::InvalidHost => "invalid_host",
            Self::AutomatedContent => "automated_content",
            Self::RateLimited {
                challenge: Some(_), ..
            } => "challenge_required",
            Self::RateLimited { .. } => "rate_limited",
            Self::Challenge(e) => e.code(),
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::Tampered => "tampered",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Seconds the client should wait before retrying, if any
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Returns true if the failure is the server's fault rather than the caller's
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}
