//! Request gatekeeper: host allow-list, threat assessment, rate limits,
//! challenge escalation and the message entropy policy.
//!
//! Protected endpoints run the full pipeline through [`Gatekeeper::admit`];
//! read-only endpoints only get [`Gatekeeper::screen`].

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, header};
use std::collections::HashSet;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use stillwater_common::{ProtectedRoute, StillwaterError, ThreatAssessment};

use crate::challenge::ChallengeEngine;
use crate::config::{AppConfig, EntropyConfig};
use crate::identity::{client_ip, fingerprint, fingerprint_raw};
use crate::limiter::{FingerprintDecision, GlobalDecision, RateLimiter};
use crate::sanitize::shannon_entropy;
use crate::tor::{TorDetector, browser_score};

/// What the gatekeeper needs to know about an inbound request
#[derive(Debug, Clone)]
pub struct Caller {
    pub headers: HeaderMap,
    pub method: Method,
    pub path: String,
    pub peer: Option<SocketAddr>,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            headers: parts.headers.clone(),
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            peer: parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        })
    }
}

/// Challenge answer carried in a protected request body
#[derive(Debug, Clone, Copy)]
pub struct ChallengeAnswer<'a> {
    pub challenge_id: &'a str,
    pub answer: &'a str,
}

impl<'a> ChallengeAnswer<'a> {
    /// Both fields must be present for the answer to count
    pub fn from_parts(challenge_id: Option<&'a str>, answer: Option<&'a str>) -> Option<Self> {
        Some(Self {
            challenge_id: challenge_id?,
            answer: answer?,
        })
    }
}

/// Request gatekeeper service
pub struct Gatekeeper {
    allowed_hosts: HashSet<String>,
    suspicious_score: u8,
    entropy: EntropyConfig,
    tor: Arc<TorDetector>,
    limiter: Arc<RateLimiter>,
    challenges: Arc<ChallengeEngine>,
}

impl Gatekeeper {
    pub fn new(
        config: &AppConfig,
        tor: Arc<TorDetector>,
        limiter: Arc<RateLimiter>,
        challenges: Arc<ChallengeEngine>,
    ) -> Self {
        Self {
            allowed_hosts: config
                .server
                .allowed_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            suspicious_score: config.tor.suspicious_score,
            entropy: config.entropy.clone(),
            tor,
            limiter,
            challenges,
        }
    }

    /// Exactly one `Host` header, matched case-insensitively (port included)
    pub fn check_host(&self, headers: &HeaderMap) -> Result<(), StillwaterError> {
        let mut values = headers.get_all(header::HOST).iter();
        let host = match (values.next(), values.next()) {
            (Some(value), None) => value.to_str().ok().map(str::to_ascii_lowercase),
            _ => None,
        };

        match host {
            Some(host) if self.allowed_hosts.contains(&host) => Ok(()),
            _ => {
                tracing::debug!(
                    hosts = headers.get_all(header::HOST).iter().count(),
                    host = ?headers.get(header::HOST),
                    "Rejected host header"
                );
                Err(StillwaterError::InvalidHost)
            }
        }
    }

    /// Resolve identity and score the caller
    pub fn assess(&self, caller: &Caller) -> ThreatAssessment {
        let ip = client_ip(&caller.headers, caller.peer);
        let fingerprint = fingerprint(&caller.headers, &caller.method, &caller.path);
        let is_tor_exit = self.tor.is_exit_node(&ip);
        let browser = browser_score(&caller.headers);
        let suspicious = is_tor_exit || browser.score >= self.suspicious_score;

        ThreatAssessment {
            client_ip: ip,
            fingerprint,
            is_tor_exit,
            browser,
            suspicious,
        }
    }

    /// Host check, assessment and global budget; used by non-protected endpoints
    pub fn screen(&self, caller: &Caller) -> Result<ThreatAssessment, StillwaterError> {
        self.check_host(&caller.headers)?;
        let assessment = self.assess(caller);
        self.check_global()?;
        Ok(assessment)
    }

    /// Full pipeline for protected endpoints.
    ///
    /// A throttled caller without a bypass is answered with a challenge
    /// while the window still allows one, and with a hard 429 afterwards.
    /// A challenge answer in the body is verified last; solving it only
    /// helps later requests.
    pub fn admit(
        &self,
        caller: &Caller,
        answer: Option<ChallengeAnswer<'_>>,
    ) -> Result<ThreatAssessment, StillwaterError> {
        let assessment = self.screen(caller)?;
        let fp = assessment.fingerprint.as_str();

        let limit = self.fingerprint_limit(assessment.suspicious);
        if let FingerprintDecision::Throttled {
            needs_challenge,
            retry_after_secs,
        } = self.limiter.check_fingerprint(fp, limit)
        {
            if self.challenges.has_bypass(fp) {
                tracing::debug!(fingerprint = %fp, "Throttled caller holds a solved challenge");
            } else if needs_challenge {
                let prompt = self.challenges.issue();
                let issued = self.limiter.record_challenge(fp);
                tracing::info!(
                    fingerprint = %fp,
                    suspicious = assessment.suspicious,
                    issued,
                    "Rate limit reached, challenge issued"
                );
                return Err(StillwaterError::RateLimited {
                    retry_after_secs,
                    challenge: Some(prompt),
                });
            } else {
                tracing::warn!(
                    fingerprint = %fp,
                    client_ip = %assessment.client_ip,
                    "Challenge budget exhausted, blocking"
                );
                return Err(StillwaterError::RateLimited {
                    retry_after_secs,
                    challenge: None,
                });
            }
        }

        if let Some(answer) = answer {
            self.challenges
                .verify(answer.challenge_id, answer.answer, fp)?;
        }

        Ok(assessment)
    }

    /// Verify a challenge on behalf of a protected route.
    ///
    /// The fingerprint is computed as if the request had been sent to
    /// `route`, so the solved challenge unlocks that endpoint.
    pub fn verify_for_route(
        &self,
        caller: &Caller,
        route: ProtectedRoute,
        challenge_id: &str,
        answer: &str,
    ) -> Result<(), StillwaterError> {
        self.screen(caller)?;
        let fp = fingerprint_raw(&caller.headers, route.method(), route.path());
        self.challenges.verify(challenge_id, answer, &fp)?;
        Ok(())
    }

    /// Reject low- or high-entropy messages from suspicious callers; log the rest
    pub fn check_entropy(
        &self,
        assessment: &ThreatAssessment,
        message: &str,
    ) -> Result<(), StillwaterError> {
        if !self.entropy.enabled {
            return Ok(());
        }

        let entropy = shannon_entropy(message);
        if entropy >= self.entropy.low_bits && entropy <= self.entropy.high_bits {
            return Ok(());
        }

        if assessment.suspicious {
            tracing::info!(
                entropy,
                client_ip = %assessment.client_ip,
                "Blocked message with suspicious entropy"
            );
            return Err(StillwaterError::AutomatedContent);
        }

        tracing::debug!(entropy, "Unusual message entropy from unsuspicious caller, allowing");
        Ok(())
    }

    fn check_global(&self) -> Result<(), StillwaterError> {
        match self.limiter.check_global() {
            GlobalDecision::Allowed => Ok(()),
            GlobalDecision::Rejected { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "Global rate limit reached");
                Err(StillwaterError::RateLimited {
                    retry_after_secs,
                    challenge: None,
                })
            }
        }
    }

    fn fingerprint_limit(&self, suspicious: bool) -> u32 {
        let config = self.limiter.config();
        if suspicious {
            config.suspicious_fingerprint_limit
        } else {
            config.fingerprint_limit
        }
    }
}
