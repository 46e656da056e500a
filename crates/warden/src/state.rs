//! Application state and shared services.

use anyhow::{Context, Result};
use std::sync::Arc;

use stillwater_common::MetricsSnapshot;

use crate::challenge::ChallengeEngine;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::gatekeeper::Gatekeeper;
use crate::limiter::{RateLimiter, WindowCounter};
use crate::llm::LlmClient;
use crate::signing::Signer;
use crate::store::{FeedbackStore, SecureStore};
use crate::tor::TorDetector;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Tor exit list
    pub tor: Arc<TorDetector>,

    /// Global and per-fingerprint budgets
    pub limiter: Arc<RateLimiter>,

    /// Math challenges
    pub challenges: Arc<ChallengeEngine>,

    /// Request pipeline
    pub gatekeeper: Arc<Gatekeeper>,

    /// Signed share records
    pub shares: Arc<SecureStore>,

    /// Vote tallies
    pub feedback: Arc<FeedbackStore>,

    /// Per-address budget for the feedback endpoints
    pub feedback_limiter: Arc<WindowCounter>,

    /// Upstream model
    pub llm: Arc<dyn LlmClient>,
}

impl AppState {
    /// Build every service from configuration; fails on weak secrets
    pub fn new(config: AppConfig, clock: Arc<dyn Clock>, llm: Arc<dyn LlmClient>) -> Result<Self> {
        let share_signer = Signer::new("share_secret", &config.secrets.share_secret)?;
        let challenge_signer = Signer::new("challenge_secret", &config.secrets.challenge_secret)?;

        let tor = Arc::new(
            TorDetector::new(config.tor.clone(), clock.clone())
                .context("Failed to initialise Tor detector")?,
        );
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone(), clock.clone()));
        let challenges = Arc::new(ChallengeEngine::new(
            &config.challenge,
            challenge_signer,
            clock.clone(),
        ));
        let gatekeeper = Arc::new(Gatekeeper::new(
            &config,
            tor.clone(),
            limiter.clone(),
            challenges.clone(),
        ));
        let shares = Arc::new(SecureStore::new(&config.store, share_signer, clock.clone()));
        let feedback = Arc::new(FeedbackStore::new(config.store.max_age(), clock.clone()));
        let feedback_limiter = Arc::new(WindowCounter::new(config.feedback.window(), clock));

        Ok(Self {
            config: Arc::new(config),
            tor,
            limiter,
            challenges,
            gatekeeper,
            shares,
            feedback,
            feedback_limiter,
            llm,
        })
    }

    /// Current counters for the metrics endpoint
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            global_requests_in_window: self.limiter.global_in_window(),
            tracked_fingerprints: self.limiter.tracked_fingerprints() as u64,
            active_challenges: self.challenges.len() as u64,
            stored_shares: self.shares.len() as u64,
            tor_exit_nodes: self.tor.len() as u64,
        }
    }
}
