//! Configuration management for Warden.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use stillwater_common::StillwaterError;
use stillwater_common::constants::*;

use crate::signing::validate_secret;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// HMAC keys for shares and challenges
    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub challenge: ChallengeConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub tor: TorConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub entropy: EntropyConfig,

    #[serde(default)]
    pub feedback: FeedbackConfig,

    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

/// HTTP surface configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Accepted `Host` header values, including port where one is used
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// CORS origins
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Base URL used in share links and preview metadata
    #[serde(default = "default_public_origin")]
    pub public_origin: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            allowed_hosts: default_allowed_hosts(),
            allowed_origins: default_allowed_origins(),
            public_origin: default_public_origin(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Signing secrets; never printed
#[derive(Clone, Default, Deserialize)]
pub struct SecretsConfig {
    #[serde(default)]
    pub share_secret: String,

    #[serde(default)]
    pub challenge_secret: String,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("share_secret", &redacted(&self.share_secret))
            .field("challenge_secret", &redacted(&self.challenge_secret))
            .finish()
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests accepted per window across all callers
    #[serde(default = "default_global_limit")]
    pub global_limit: u32,

    #[serde(default = "default_rate_window")]
    pub window_secs: u64,

    /// Requests per window for one fingerprint
    #[serde(default = "default_fingerprint_limit")]
    pub fingerprint_limit: u32,

    /// Tightened limit for Tor exits and privacy browsers
    #[serde(default = "default_suspicious_limit")]
    pub suspicious_fingerprint_limit: u32,

    /// Challenges offered per fingerprint window before a hard block
    #[serde(default = "default_max_challenges")]
    pub max_challenges_per_window: u32,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_limit: default_global_limit(),
            window_secs: default_rate_window(),
            fingerprint_limit: default_fingerprint_limit(),
            suspicious_fingerprint_limit: default_suspicious_limit(),
            max_challenges_per_window: default_max_challenges(),
        }
    }
}

/// Math challenge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeConfig {
    #[serde(default = "default_challenge_ttl")]
    pub ttl_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl ChallengeConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_challenge_ttl(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Share store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_share_max_age")]
    pub max_age_secs: u64,

    #[serde(default = "default_max_question")]
    pub max_question_chars: usize,

    #[serde(default = "default_max_answer")]
    pub max_answer_chars: usize,
}

impl StoreConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_share_max_age(),
            max_question_chars: default_max_question(),
            max_answer_chars: default_max_answer(),
        }
    }
}

/// Tor exit detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_tor_url")]
    pub exit_list_url: String,

    /// Scheduled refresh spacing
    #[serde(default = "default_tor_refresh")]
    pub refresh_interval_secs: u64,

    /// Age after which lookups trigger a lazy refresh
    #[serde(default = "default_tor_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_tor_timeout")]
    pub fetch_timeout_secs: u64,

    /// Browser score at which a caller counts as suspicious
    #[serde(default = "default_suspicious_score")]
    pub suspicious_score: u8,
}

impl TorConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exit_list_url: default_tor_url(),
            refresh_interval_secs: default_tor_refresh(),
            cache_ttl_secs: default_tor_cache_ttl(),
            fetch_timeout_secs: default_tor_timeout(),
            suspicious_score: default_suspicious_score(),
        }
    }
}

/// Upstream LLM configuration
#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redacted(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: String::new(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Shannon entropy screening of chat messages
#[derive(Debug, Clone, Deserialize)]
pub struct EntropyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_entropy_low")]
    pub low_bits: f64,

    #[serde(default = "default_entropy_high")]
    pub high_bits: f64,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            low_bits: default_entropy_low(),
            high_bits: default_entropy_high(),
        }
    }
}

/// Feedback endpoint limits
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackConfig {
    /// Requests per window per client address
    #[serde(default = "default_feedback_limit")]
    pub rate_limit: u32,

    #[serde(default = "default_rate_window")]
    pub window_secs: u64,
}

impl FeedbackConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            rate_limit: default_feedback_limit(),
            window_secs: default_rate_window(),
        }
    }
}

/// Background sweep configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl MaintenanceConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_allowed_hosts() -> Vec<String> { DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect() }
fn default_allowed_origins() -> Vec<String> { DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect() }
fn default_public_origin() -> String { DEFAULT_PUBLIC_ORIGIN.to_string() }
fn default_request_timeout() -> u64 { DEFAULT_REQUEST_TIMEOUT_SECS }
fn default_global_limit() -> u32 { GLOBAL_RATE_LIMIT }
fn default_rate_window() -> u64 { RATE_WINDOW_SECS }
fn default_fingerprint_limit() -> u32 { FINGERPRINT_LIMIT }
fn default_suspicious_limit() -> u32 { SUSPICIOUS_FINGERPRINT_LIMIT }
fn default_max_challenges() -> u32 { MAX_CHALLENGES_PER_WINDOW }
fn default_challenge_ttl() -> u64 { CHALLENGE_TTL_SECS } // 5 minutes
fn default_max_attempts() -> u32 { CHALLENGE_MAX_ATTEMPTS }
fn default_share_max_age() -> u64 { SHARE_MAX_AGE_SECS } // 24 hours
fn default_max_question() -> usize { MAX_QUESTION_CHARS }
fn default_max_answer() -> usize { MAX_ANSWER_CHARS }
fn default_tor_url() -> String { TOR_EXIT_LIST_URL.to_string() }
fn default_tor_refresh() -> u64 { TOR_REFRESH_INTERVAL_SECS } // 1 hour
fn default_tor_cache_ttl() -> u64 { TOR_CACHE_TTL_SECS } // 2 hours
fn default_tor_timeout() -> u64 { TOR_FETCH_TIMEOUT_SECS }
fn default_suspicious_score() -> u8 { SUSPICIOUS_BROWSER_SCORE }
fn default_llm_base_url() -> String { DEFAULT_LLM_BASE_URL.to_string() }
fn default_llm_model() -> String { DEFAULT_LLM_MODEL.to_string() }
fn default_entropy_low() -> f64 { ENTROPY_LOW_BITS }
fn default_entropy_high() -> f64 { ENTROPY_HIGH_BITS }
fn default_feedback_limit() -> u32 { FEEDBACK_RATE_LIMIT }
fn default_sweep_interval() -> u64 { SWEEP_INTERVAL_SECS } // 5 minutes

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

impl AppConfig {
    /// Load configuration from file and `WARDEN__` environment, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_hosts")
                    .with_list_parse_key("server.allowed_origins"),
            )
            .build()
            .context("Failed to load configuration")?;

        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to parse config")?;

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.server.listen_addr = listen.clone();
        }
        if let Some(ref secret) = args.share_secret {
            config.secrets.share_secret = secret.clone();
        }
        if let Some(ref secret) = args.challenge_secret {
            config.secrets.challenge_secret = secret.clone();
        }
        if let Some(ref key) = args.llm_api_key {
            config.llm.api_key = key.clone();
        }

        Ok(config)
    }

    /// Refuse to start with weak secrets or unusable limits
    pub fn validate(&self) -> Result<(), StillwaterError> {
        let fail = |msg: String| Err(StillwaterError::Config(msg));

        for (name, secret) in [
            ("share_secret", &self.secrets.share_secret),
            ("challenge_secret", &self.secrets.challenge_secret),
        ] {
            if secret.is_empty() {
                return fail(format!("{name} is not set"));
            }
            if let Err(reason) = validate_secret(secret) {
                return fail(format!("{name}: {reason}"));
            }
        }
        if self.secrets.share_secret == self.secrets.challenge_secret {
            return fail("share_secret and challenge_secret must differ".to_string());
        }

        if self.server.allowed_hosts.is_empty() {
            return fail("server.allowed_hosts is empty".to_string());
        }
        if self.server.allowed_origins.is_empty() {
            return fail("server.allowed_origins is empty".to_string());
        }
        if self.server.allowed_origins.iter().any(|o| o == "*") {
            return fail("server.allowed_origins must not contain a wildcard".to_string());
        }

        let limits = [
            ("rate_limit.global_limit", u64::from(self.rate_limit.global_limit)),
            ("rate_limit.window_secs", self.rate_limit.window_secs),
            ("rate_limit.fingerprint_limit", u64::from(self.rate_limit.fingerprint_limit)),
            (
                "rate_limit.suspicious_fingerprint_limit",
                u64::from(self.rate_limit.suspicious_fingerprint_limit),
            ),
            ("challenge.ttl_secs", self.challenge.ttl_secs),
            ("challenge.max_attempts", u64::from(self.challenge.max_attempts)),
            ("store.max_age_secs", self.store.max_age_secs),
            ("feedback.rate_limit", u64::from(self.feedback.rate_limit)),
            ("feedback.window_secs", self.feedback.window_secs),
            ("maintenance.sweep_interval_secs", self.maintenance.sweep_interval_secs),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return fail(format!("{name} must be greater than zero"));
        }

        if self.rate_limit.suspicious_fingerprint_limit > self.rate_limit.fingerprint_limit {
            return fail(
                "rate_limit.suspicious_fingerprint_limit exceeds fingerprint_limit".to_string(),
            );
        }
        if self.entropy.low_bits >= self.entropy.high_bits {
            return fail("entropy.low_bits must be below entropy.high_bits".to_string());
        }

        Ok(())
    }
}
