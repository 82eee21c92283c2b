use crate::application::ports::RemoteApplyError;
use crate::domain::entities::SyncQueueItem;
use crate::domain::value_objects::SyncQueueStatus;
use crate::shared::config::{BackoffStrategy, SyncConfig};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Decides whether a queued item may be sent again and how long to wait first.
///
/// Every function here is pure in the item state; the clock is passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    retry_delay: Duration,
    strategy: BackoffStrategy,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_retries: u32,
        retry_delay: Duration,
        strategy: BackoffStrategy,
        max_backoff: Duration,
    ) -> Self {
        Self {
            max_retries,
            retry_delay,
            strategy,
            max_backoff,
        }
    }

    pub fn flat(max_retries: u32, retry_delay: Duration) -> Self {
        Self::new(max_retries, retry_delay, BackoffStrategy::Flat, retry_delay)
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.max_retries,
            config.retry_delay(),
            config.backoff,
            config.max_backoff(),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// `false` once the item is marked failed or `attempts >= max_retries`.
    /// An item that was never tried is always eligible.
    pub fn should_retry(&self, item: &SyncQueueItem) -> bool {
        if item.status == SyncQueueStatus::Failed {
            return false;
        }
        item.attempts == 0 || item.attempts < self.max_retries
    }

    /// Wait before the next try of an item that has failed `attempts` times.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Flat => self.retry_delay,
            BackoffStrategy::Exponential => {
                let exponent = attempts.saturating_sub(1).min(31);
                let factor = 1u32 << exponent;
                self.retry_delay
                    .checked_mul(factor)
                    .unwrap_or(self.max_backoff)
                    .min(self.max_backoff)
            }
        }
    }

    /// Item after one more failed try. Rejections and an exhausted budget mark it failed.
    pub fn record_failure(
        &self,
        item: &SyncQueueItem,
        error: &RemoteApplyError,
        now: DateTime<Utc>,
    ) -> SyncQueueItem {
        let mut updated = item.clone();
        updated.attempts = item.attempts.saturating_add(1);
        updated.last_error = Some(error.to_string());
        updated.modified_at = now;
        if error.is_permanent() || updated.attempts >= self.max_retries {
            updated.status = SyncQueueStatus::Failed;
        }
        updated
    }

    /// Item with a fresh retry budget, used by a manual "retry" action.
    pub fn reset(&self, item: &SyncQueueItem, now: DateTime<Utc>) -> SyncQueueItem {
        let mut updated = item.clone();
        updated.attempts = 0;
        updated.last_error = None;
        updated.status = SyncQueueStatus::Pending;
        updated.modified_at = now;
        updated
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
