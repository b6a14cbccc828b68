//! Worker timing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{WorkerError, WorkerResult};

/// Polling and bookkeeping intervals, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Time between ticks
    pub poll_interval_secs: u64,
    /// Pause after a confirmed end before reading again
    pub cooldown_secs: u64,
    /// Give up tracking a transaction that has no receipt after this long
    pub stale_tx_timeout_secs: u64,
    /// How long a processed battle number is remembered
    pub processed_ttl_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            cooldown_secs: 30,
            stale_tx_timeout_secs: 600,
            processed_ttl_secs: 300,
        }
    }
}

impl WorkerConfig {
    /// Poll every `secs`. The cooldown follows along; the stale timeout and
    /// processed TTL are raised so they keep spanning several ticks.
    pub fn with_poll_interval(self, secs: u64) -> Self {
        Self {
            poll_interval_secs: secs,
            cooldown_secs: secs,
            stale_tx_timeout_secs: self.stale_tx_timeout_secs.max(secs.saturating_mul(4)),
            processed_ttl_secs: self.processed_ttl_secs.max(secs.saturating_mul(2)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> WorkerResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(WorkerError::InvalidConfig("poll_interval_secs must be > 0".into()));
        }
        if self.stale_tx_timeout_secs <= self.poll_interval_secs {
            return Err(WorkerError::InvalidConfig(
                "stale_tx_timeout_secs must exceed poll_interval_secs".into(),
            ));
        }
        if self.processed_ttl_secs < self.poll_interval_secs {
            return Err(WorkerError::InvalidConfig(
                "processed_ttl_secs must be at least poll_interval_secs".into(),
            ));
        }
        Ok(())
    }
}
