//! Clock adapters
//!
//! `SystemClock` for production, `ManualClock` for deterministic tests.

use crate::domain::{millis, Timestamp};
use crate::ports::Clock;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        millis(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default(),
        )
    }

    async fn sleep_until(&self, deadline: Timestamp) {
        let now = self.now();
        if deadline > now {
            tokio::time::sleep(Duration::from_millis(deadline - now)).await;
        }
    }
}

/// Clock that only moves when told to.
///
/// Sleepers are woken on every `advance`/`set` and re-check their deadline.
#[derive(Debug)]
pub struct ManualClock {
    now: watch::Sender<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        let (now, _) = watch::channel(start);
        Self { now }
    }

    pub fn advance(&self, by: Duration) {
        let by = millis(by);
        self.now.send_modify(|now| *now = now.saturating_add(by));
    }

    pub fn set(&self, now: Timestamp) {
        self.now.send_replace(now);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.borrow()
    }

    async fn sleep_until(&self, deadline: Timestamp) {
        let mut rx = self.now.subscribe();
        loop {
            if *rx.borrow_and_update() >= deadline {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
