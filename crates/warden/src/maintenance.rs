//! Background maintenance: periodic sweeps and Tor list refresh.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::state::AppState;
use crate::tor::RefreshOutcome;

/// Counts removed by one sweep pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub challenges: usize,
    pub rate_entries: usize,
    pub shares: usize,
    pub feedback: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.challenges + self.rate_entries + self.shares + self.feedback
    }
}

/// Sweeps every in-memory store owned by the application state
pub struct Maintenance {
    state: AppState,
}

impl Maintenance {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// One sweep over challenges, limiter windows, shares and feedback
    pub fn run_once(&self) -> SweepReport {
        let idle = self.state.config.feedback.window() * 2;
        SweepReport {
            challenges: self.state.challenges.sweep(),
            rate_entries: self.state.limiter.sweep() + self.state.feedback_limiter.sweep(idle),
            shares: self.state.shares.sweep(),
            feedback: self.state.feedback.sweep(),
        }
    }
}

/// Sweep on a fixed interval until shutdown
pub async fn sweep_worker(maintenance: Arc<Maintenance>, mut shutdown: broadcast::Receiver<()>) {
    let interval = maintenance.state.config.maintenance.sweep_interval();
    tracing::info!(interval = ?interval, "🧹 Sweep worker started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let report = maintenance.run_once();
                if report.total() > 0 {
                    tracing::debug!(
                        challenges = report.challenges,
                        rate_entries = report.rate_entries,
                        shares = report.shares,
                        feedback = report.feedback,
                        "Sweep completed"
                    );
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("🧹 Sweep worker shutting down...");
                break;
            }
        }
    }
}

/// Refresh the Tor exit list at startup, then on the configured interval
pub async fn tor_refresh_worker(state: AppState, mut shutdown: broadcast::Receiver<()>) {
    if !state.config.tor.enabled {
        tracing::info!("Tor exit detection disabled");
        return;
    }

    let interval = state.config.tor.refresh_interval();
    tracing::info!(interval = ?interval, "🧅 Tor refresh worker started");

    let mut delay = Duration::ZERO;
    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                if let RefreshOutcome::Failed = state.tor.refresh().await {
                    tracing::warn!(cached = state.tor.len(), "Tor exit list refresh failed");
                }
                delay = interval;
            }
            _ = shutdown.recv() => {
                tracing::info!("🧅 Tor refresh worker shutting down...");
                break;
            }
        }
    }
}
