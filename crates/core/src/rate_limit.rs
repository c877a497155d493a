//! Minimum-interval task scheduler used between backfill windows.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Starts scheduled tasks at least `min_interval` apart.
///
/// Slots are reserved in call order, so concurrent callers are serialized
/// without holding the lock across the wait.
#[derive(Debug)]
pub struct MinIntervalScheduler {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl MinIntervalScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait for the next free slot, then run `task`.
    pub async fn schedule<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let start = next.map_or(now, |slot| slot.max(now));
            *next = Some(start + self.min_interval);
            start
        };

        tokio::time::sleep_until(start).await;
        task.await
    }
}
