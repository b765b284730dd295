//! Human-intervention recovery loop.
//!
//! When the title is missing right after navigation the page is most likely
//! a verification challenge. The loop then waits in fixed intervals, giving
//! an operator (or slow rendering) the chance to clear it, and re-probes the
//! title after each interval.
//!
//! ```text
//! Probing --title--> Success
//!    |
//!    +--empty--> Waiting --title--> Success
//!                   |
//!                   +--attempts spent--> Exhausted
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

/// Retry bound for the waiting phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Re-probes after the initial probe
    pub attempts: u32,
    /// Pause before each re-probe
    pub interval: Duration,
}

impl RecoveryPolicy {
    /// Upper bound on the time spent waiting
    pub fn total_wait(&self) -> Duration {
        self.interval * self.attempts
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            interval: Duration::from_secs(5),
        }
    }
}

/// Terminal state of a recovery run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Success,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryOutcome {
    pub state: RecoveryState,
    /// The title once found
    pub title: Option<String>,
    /// Probes made, the initial one included
    pub probes: u32,
}

impl RecoveryOutcome {
    /// Probes made during the waiting phase
    pub fn retries(&self) -> u32 {
        self.probes.saturating_sub(1)
    }
}

pub struct RecoveryLoop {
    policy: RecoveryPolicy,
}

impl RecoveryLoop {
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self { policy }
    }

    /// Probe for a title, waiting and re-probing while it is empty.
    ///
    /// `on_waiting` runs once, on entering the waiting phase. Sleeps are
    /// cooperative so other tasks keep running during the wait.
    pub async fn run<P, PF, W, WF>(&self, mut probe: P, on_waiting: W) -> RecoveryOutcome
    where
        P: FnMut() -> PF,
        PF: Future<Output = String>,
        W: FnOnce() -> WF,
        WF: Future<Output = ()>,
    {
        let mut probes = 1;
        let title = probe().await;
        if !title.is_empty() {
            return self.finish(RecoveryState::Success, Some(title), probes);
        }

        warn!(
            "Title not found, possibly a verification challenge; waiting up to {:?} for manual remediation",
            self.policy.total_wait()
        );
        on_waiting().await;

        // Waiting: one re-probe per interval until the attempts are spent
        while probes <= self.policy.attempts {
            tokio::time::sleep(self.policy.interval).await;
            probes += 1;
            let title = probe().await;
            if !title.is_empty() {
                info!("Title found after {} retries", probes - 1);
                return self.finish(RecoveryState::Success, Some(title), probes);
            }
        }

        self.finish(RecoveryState::Exhausted, None, probes)
    }

    fn finish(&self, state: RecoveryState, title: Option<String>, probes: u32) -> RecoveryOutcome {
        RecoveryOutcome {
            state,
            title,
            probes,
        }
    }
}
