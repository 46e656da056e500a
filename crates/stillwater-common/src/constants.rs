//! Shared constants for Stillwater components.

/// Default Warden HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8787";

/// Public origin the frontend is served from
pub const DEFAULT_PUBLIC_ORIGIN: &str = "https://minnebo.ai";

/// Hosts accepted in the `Host` header by default
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "minnebo.ai",
    "www.minnebo.ai",
    "minnebo-ai.vercel.app",
    "localhost:3000",
];

/// Origins allowed by CORS by default (never a wildcard)
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://minnebo.ai",
    "https://minnebo-ai.vercel.app",
    "http://localhost:3000",
];

/// Whole-request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Minimum length for HMAC signing secrets
pub const MIN_SECRET_LEN: usize = 64;

/// Global request budget per window
pub const GLOBAL_RATE_LIMIT: u32 = 1000;

/// Length of both the global and the per-fingerprint window (seconds)
pub const RATE_WINDOW_SECS: u64 = 60;

/// Requests per fingerprint per window
pub const FINGERPRINT_LIMIT: u32 = 5;

/// Requests per fingerprint per window once the caller looks suspicious
pub const SUSPICIOUS_FINGERPRINT_LIMIT: u32 = 2;

/// Challenges that may be issued to one fingerprint per window before a hard block
pub const MAX_CHALLENGES_PER_WINDOW: u32 = 3;

/// Challenge lifetime (5 minutes)
pub const CHALLENGE_TTL_SECS: u64 = 300;

/// Verification attempts per challenge
pub const CHALLENGE_MAX_ATTEMPTS: u32 = 3;

/// Share record lifetime (24 hours)
pub const SHARE_MAX_AGE_SECS: u64 = 86_400;

/// Maximum question length in characters
pub const MAX_QUESTION_CHARS: usize = 500;

/// Maximum answer length in characters
pub const MAX_ANSWER_CHARS: usize = 5000;

/// Maximum chat message length in characters (after NFKC)
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Maximum chat message size in UTF-8 bytes (after NFKC)
pub const MAX_MESSAGE_BYTES: usize = 4000;

/// Feedback requests per client per window
pub const FEEDBACK_RATE_LIMIT: u32 = 30;

/// Interval between background sweeps (5 minutes)
pub const SWEEP_INTERVAL_SECS: u64 = 300;

/// Public Tor bulk exit list
pub const TOR_EXIT_LIST_URL: &str = "https://check.torproject.org/torbulkexitlist";

/// Tor exit list refresh interval (1 hour)
pub const TOR_REFRESH_INTERVAL_SECS: u64 = 3600;

/// Age after which the Tor exit list is considered stale (2 hours)
pub const TOR_CACHE_TTL_SECS: u64 = 7200;

/// Timeout for the Tor exit list fetch
pub const TOR_FETCH_TIMEOUT_SECS: u64 = 10;

/// Browser heuristic score at which a caller counts as suspicious
pub const SUSPICIOUS_BROWSER_SCORE: u8 = 3;

/// Shannon entropy (bits) below which a message looks automated
pub const ENTROPY_LOW_BITS: f64 = 1.5;

/// Shannon entropy (bits) above which a message looks like gibberish
pub const ENTROPY_HIGH_BITS: f64 = 5.5;

/// Default LLM endpoint base
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default LLM model
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";

/// User agent sent on outbound requests
pub const OUTBOUND_USER_AGENT: &str = "stillwater-warden/0.1";

/// Value used when no client address can be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// HTTP header names
pub mod headers {
    /// Proxy chain header carrying the original client address
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

    /// Fetch metadata headers sent by modern browsers
    pub const SEC_FETCH_SITE: &str = "sec-fetch-site";
    pub const SEC_FETCH_MODE: &str = "sec-fetch-mode";
    pub const SEC_CH_UA: &str = "sec-ch-ua";
}
