//! Monitor configuration.

use std::time::Duration;

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bound for the retry delay after consecutive failures.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// First block the monitor processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPoint {
    /// Only blocks mined after the first poll.
    #[default]
    Latest,
    /// This block and everything after it.
    Block(u64),
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub max_backoff: Duration,
    pub start: StartPoint,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_backoff: DEFAULT_MAX_BACKOFF,
            start: StartPoint::Latest,
        }
    }
}

impl MonitorConfig {
    /// Delay before the next poll after `failures` consecutive failures.
    /// Doubles from the poll interval, capped at `max_backoff`.
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.poll_interval;
        }
        let factor = 1u32 << failures.min(16);
        self.poll_interval
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}
