// src/client/clock.rs

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Source of one-second ticks for the exam countdown.
#[async_trait]
pub trait Clock: Send {
    /// Resolves when the next second has elapsed.
    async fn tick(&mut self);
}

/// Wall-clock ticks backed by a tokio interval.
#[derive(Debug)]
pub struct IntervalClock {
    interval: Interval,
}

impl IntervalClock {
    pub fn every_second() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    pub fn with_period(period: Duration) -> Self {
        // First tick lands one period from now, not immediately.
        let mut interval = interval_at(Instant::now() + period, period);
        // Seconds missed while the task was busy are delivered at once, so the
        // countdown stays on wall time.
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Self { interval }
    }
}

#[async_trait]
impl Clock for IntervalClock {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// A clock that ticks as fast as it is polled and counts how often it did.
/// Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    ticks: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for VirtualClock {
    async fn tick(&mut self) {
        tokio::task::yield_now().await;
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}
