//! Tor exit detection.
//!
//! Keeps an in-memory set of known exit addresses, refreshed on a timer by
//! the maintenance worker and lazily when a lookup finds the list stale.
//! A failed download never clears the current list.

mod browser;
mod exit_list;

pub use browser::browser_score;
pub use exit_list::parse_exit_list;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use stillwater_common::constants::{OUTBOUND_USER_AGENT, UNKNOWN_CLIENT};

use crate::clock::{Clock, millis};
use crate::config::TorConfig;

/// Minimum spacing between lazy refresh attempts after a failure
const LAZY_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Result of one refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// List replaced with this many addresses
    Updated(usize),
    /// Refreshed recently or another refresh is in flight
    Skipped,
    /// Download failed; previous list retained
    Failed,
}

#[derive(Default)]
struct ExitSet {
    nodes: HashSet<String>,
    refreshed_at: Option<i64>,
    last_attempt_at: Option<i64>,
}

/// Resets the in-flight flag even if the refresh future is dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Tor exit node detector
pub struct TorDetector {
    config: TorConfig,
    clock: Arc<dyn Clock>,
    client: reqwest::Client,
    exits: RwLock<ExitSet>,
    refreshing: AtomicBool,
}

impl TorDetector {
    pub fn new(config: TorConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(OUTBOUND_USER_AGENT)
            .build()
            .context("Failed to build Tor list HTTP client")?;

        Ok(Self {
            config,
            clock,
            client,
            exits: RwLock::new(ExitSet::default()),
            refreshing: AtomicBool::new(false),
        })
    }

    /// Is `ip` a known exit node? Schedules a background refresh when stale.
    pub fn is_exit_node(self: &Arc<Self>, ip: &str) -> bool {
        if !self.config.enabled || ip.is_empty() || ip == UNKNOWN_CLIENT {
            return false;
        }

        if self.is_stale() {
            self.spawn_lazy_refresh();
        }

        self.exits.read().nodes.contains(ip)
    }

    /// True when the list was never loaded or is older than the cache TTL
    pub fn is_stale(&self) -> bool {
        let now = self.clock.now_ms();
        match self.exits.read().refreshed_at {
            Some(at) => now - at > millis(self.config.cache_ttl()),
            None => true,
        }
    }

    /// Number of known exit addresses
    pub fn len(&self) -> usize {
        self.exits.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_lazy_refresh(self: &Arc<Self>) {
        let now = self.clock.now_ms();
        if let Some(at) = self.exits.read().last_attempt_at {
            if now - at < millis(LAZY_RETRY_BACKOFF) {
                return;
            }
        }

        // Lookups also happen outside a runtime (unit tests); only spawn when one exists
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let this = Arc::clone(self);
            handle.spawn(async move {
                this.refresh().await;
            });
        }
    }

    /// Download the exit list unless it was refreshed within the interval
    pub async fn refresh(&self) -> RefreshOutcome {
        if !self.config.enabled {
            return RefreshOutcome::Skipped;
        }

        let now = self.clock.now_ms();
        {
            let mut exits = self.exits.write();
            if let Some(at) = exits.refreshed_at {
                if now - at < millis(self.config.refresh_interval()) {
                    return RefreshOutcome::Skipped;
                }
            }
            exits.last_attempt_at = Some(now);
        }

        if self.refreshing.swap(true, Ordering::AcqRel) {
            return RefreshOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.refreshing);

        tracing::debug!(url = %self.config.exit_list_url, "Updating Tor exit node list");

        match exit_list::fetch_exit_list(&self.client, &self.config.exit_list_url).await {
            Ok(nodes) => {
                let count = nodes.len();
                self.replace(nodes);
                tracing::info!(nodes = count, "Updated Tor exit node list");
                RefreshOutcome::Updated(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to update Tor exit node list, keeping cached list");
                RefreshOutcome::Failed
            }
        }
    }

    /// Swap in a new exit set
    pub fn replace(&self, nodes: HashSet<String>) {
        let now = self.clock.now_ms();
        let mut exits = self.exits.write();
        exits.nodes = nodes;
        exits.refreshed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn detector(clock: Arc<ManualClock>) -> Arc<TorDetector> {
        let config = TorConfig {
            // Unroutable; any fetch fails fast
            exit_list_url: "http://127.0.0.1:9/torbulkexitlist".to_string(),
            fetch_timeout_secs: 1,
            ..TorConfig::default()
        };
        Arc::new(TorDetector::new(config, clock).unwrap())
    }

    #[test]
    fn test_membership_after_replace() {
        let clock = Arc::new(ManualClock::default());
        let tor = detector(clock.clone());
        assert!(tor.is_stale());
        assert!(tor.is_empty());

        tor.replace(parse_exit_list("185.220.101.1\n185.220.101.2\n"));
        assert!(!tor.is_stale());
        assert_eq!(tor.len(), 2);
        assert!(!tor.is_empty());
        assert!(tor.is_exit_node("185.220.101.1"));
        assert!(!tor.is_exit_node("8.8.8.8"));
        assert!(!tor.is_exit_node(UNKNOWN_CLIENT));
    }

    #[test]
    fn test_goes_stale_after_cache_ttl() {
        let clock = Arc::new(ManualClock::default());
        let tor = detector(clock.clone());
        tor.replace(parse_exit_list("185.220.101.1\n"));

        clock.advance(Duration::from_secs(7200));
        assert!(!tor.is_stale());
        clock.advance(Duration::from_secs(1));
        assert!(tor.is_stale());

        // Stale data is still served
        assert!(tor.is_exit_node("185.220.101.1"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_set() {
        let clock = Arc::new(ManualClock::default());
        let tor = detector(clock.clone());
        tor.replace(parse_exit_list("185.220.101.1\n"));

        // Within the refresh interval nothing is fetched
        assert_eq!(tor.refresh().await, RefreshOutcome::Skipped);

        clock.advance(Duration::from_secs(3601));
        assert_eq!(tor.refresh().await, RefreshOutcome::Failed);
        assert!(tor.is_exit_node("185.220.101.1"));
        assert_eq!(tor.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_detector_never_matches() {
        let clock = Arc::new(ManualClock::default());
        let config = TorConfig {
            enabled: false,
            ..TorConfig::default()
        };
        let tor = Arc::new(TorDetector::new(config, clock).unwrap());
        tor.replace(parse_exit_list("185.220.101.1\n"));
        assert!(!tor.is_exit_node("185.220.101.1"));
        assert_eq!(tor.refresh().await, RefreshOutcome::Skipped);
    }
}
