//! Core types shared across Stillwater components.

use serde::{Deserialize, Serialize};

/// Math challenge handed to a throttled client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengePrompt {
    /// Opaque challenge identifier
    pub challenge_id: String,

    /// Human-readable question, e.g. `"7 + 5"`
    pub question: String,

    /// Seconds until the challenge expires
    pub expires_in_secs: u64,
}

/// Independent signals contributing to the browser heuristic score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserSignal {
    /// User agent matches a privacy browser's fixed UA string
    PrivacyUserAgent,
    /// Accept-Language equals the privacy browser's default locale
    DefaultLocale,
    /// None of the fetch-metadata headers real browsers send
    MissingFetchMetadata,
}

impl BrowserSignal {
    pub fn weight(&self) -> u8 {
        match self {
            Self::PrivacyUserAgent => 3,
            Self::DefaultLocale => 2,
            Self::MissingFetchMetadata => 1,
        }
    }
}

/// Weighted browser heuristic result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserScore {
    pub score: u8,
    pub matched_signals: Vec<BrowserSignal>,
}

impl BrowserScore {
    pub fn from_signals(matched_signals: Vec<BrowserSignal>) -> Self {
        let score = matched_signals.iter().map(BrowserSignal::weight).sum();
        Self {
            score,
            matched_signals,
        }
    }
}

/// Combined view of who is calling and how suspicious they look
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatAssessment {
    /// Best-effort origin address (or `"unknown"`)
    pub client_ip: String,

    /// Header-shape fingerprint
    pub fingerprint: String,

    /// Address is on the Tor bulk exit list
    pub is_tor_exit: bool,

    /// Browser heuristic result
    pub browser: BrowserScore,

    /// Exit node, or browser score at or above the threshold
    pub suspicious: bool,
}

/// Endpoints guarded by the full gatekeeper pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectedRoute {
    #[default]
    Chat,
    Share,
}

impl ProtectedRoute {
    /// Request path of the protected endpoint
    pub fn path(&self) -> &'static str {
        match self {
            Self::Chat => "/api/chat",
            Self::Share => "/api/share",
        }
    }

    /// Request method of the protected endpoint
    pub fn method(&self) -> &'static str {
        "POST"
    }
}

/// Chat proxy request body
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "challengeId", alias = "challenge_id")]
    pub challenge_id: Option<String>,
    #[serde(default, rename = "challengeAnswer", alias = "challenge_answer")]
    pub challenge_answer: Option<String>,
}

/// Share creation request body
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, rename = "challengeId", alias = "challenge_id")]
    pub challenge_id: Option<String>,
    #[serde(default, rename = "challengeAnswer", alias = "challenge_answer")]
    pub challenge_answer: Option<String>,
}

/// Standalone challenge verification request body
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyRequest {
    #[serde(rename = "challengeId", alias = "challenge_id")]
    pub challenge_id: String,
    pub answer: String,
    /// Endpoint the solved challenge should unlock
    #[serde(default)]
    pub route: ProtectedRoute,
}

/// Response to a successful share creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareCreated {
    pub id: String,
}

/// Verified share contents returned to readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareView {
    pub question: String,
    pub answer: String,
    /// Creation time (Unix epoch milliseconds)
    pub timestamp: i64,
}

/// Feedback vote direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

/// Feedback submission body
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackRequest {
    pub id: String,
    pub vote: Vote,
}

/// Aggregated votes for one share
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackTally {
    pub up: u64,
    pub down: u64,
}

/// Metrics snapshot for monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Requests accepted by the global limiter in the trailing window
    pub global_requests_in_window: u64,

    /// Fingerprints with a live rate window
    pub tracked_fingerprints: u64,

    /// Challenges currently stored (issued or solved)
    pub active_challenges: u64,

    /// Share records currently stored
    pub stored_shares: u64,

    /// Known Tor exit nodes
    pub tor_exit_nodes: u64,
}
