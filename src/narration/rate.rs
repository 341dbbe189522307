//! Per-minute request and character budget for the synthesis provider.
//!
//! The tracker counts successful calls inside the current wall-clock minute.
//! Once a count is over its limit, [`RateBudgetTracker::admit`] polls the
//! clock until the minute changes, then starts a fresh window. The budget is
//! provider-wide, so one tracker must be shared (by `&mut`) between every
//! pipeline that talks to the same account.

use crate::defaults;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Source of wall-clock minutes and of sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Minutes elapsed since the Unix epoch.
    fn current_minute(&self) -> i64;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the system time and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn current_minute(&self) -> i64 {
        chrono::Utc::now().timestamp().div_euclid(60)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Manually driven clock for tests and dry runs.
///
/// Sleeping never blocks. Every `sleeps_per_minute` calls to
/// [`Clock::sleep`] advance the minute by one.
#[derive(Debug)]
pub struct ManualClock {
    minute: AtomicI64,
    sleeps: AtomicU32,
    slept_ms: AtomicU64,
    sleeps_per_minute: u32,
}

impl ManualClock {
    pub fn new(start_minute: i64, sleeps_per_minute: u32) -> Self {
        Self {
            minute: AtomicI64::new(start_minute),
            sleeps: AtomicU32::new(0),
            slept_ms: AtomicU64::new(0),
            sleeps_per_minute: sleeps_per_minute.max(1),
        }
    }

    /// Move to the next minute immediately.
    pub fn advance_minute(&self) {
        self.minute.fetch_add(1, Ordering::SeqCst);
    }

    /// Total number of sleeps requested so far.
    pub fn sleeps(&self) -> u32 {
        self.sleeps.load(Ordering::SeqCst)
    }

    /// Sum of every requested sleep duration.
    pub fn slept(&self) -> Duration {
        Duration::from_millis(self.slept_ms.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn current_minute(&self) -> i64 {
        self.minute.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.slept_ms.fetch_add(millis, Ordering::SeqCst);
        let slept = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;
        if slept % self.sleeps_per_minute == 0 {
            self.advance_minute();
        }
    }
}

/// When a full budget starts blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Block once a counter is already above its limit. The call that tips
    /// the window over the limit still goes through.
    #[default]
    Lagging,
    /// Block when the next call would take a counter above its limit.
    Strict,
}

/// Thresholds for one minute window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimits {
    pub max_requests_per_minute: u32,
    pub max_characters_per_minute: u64,
    pub poll_interval: Duration,
    pub mode: AdmissionMode,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            max_requests_per_minute: defaults::MAX_REQUESTS_PER_MINUTE,
            max_characters_per_minute: defaults::MAX_CHARACTERS_PER_MINUTE,
            poll_interval: Duration::from_secs(defaults::POLL_INTERVAL_SECS),
            mode: AdmissionMode::Lagging,
        }
    }
}

/// Counters for the current minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateWindow {
    pub window_start_minute: Option<i64>,
    pub requests_in_window: u32,
    pub characters_in_window: u64,
}

impl RateWindow {
    fn starting_at(minute: i64) -> Self {
        Self {
            window_start_minute: Some(minute),
            requests_in_window: 0,
            characters_in_window: 0,
        }
    }
}

/// Gatekeeper for calls to the synthesis provider.
pub struct RateBudgetTracker {
    limits: RateLimits,
    window: RateWindow,
    clock: Arc<dyn Clock>,
    total_requests: u64,
    total_characters: u64,
}

impl RateBudgetTracker {
    pub fn new(limits: RateLimits) -> Self {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    pub fn with_clock(limits: RateLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            limits,
            window: RateWindow::default(),
            clock,
            total_requests: 0,
            total_characters: 0,
        }
    }

    pub fn limits(&self) -> &RateLimits {
        &self.limits
    }

    pub fn window(&self) -> RateWindow {
        self.window
    }

    /// Successful requests since the tracker was created.
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Characters sent in successful requests since the tracker was created.
    pub fn total_characters(&self) -> u64 {
        self.total_characters
    }

    /// Wait until one more call of `characters` characters may be issued.
    ///
    /// Returns how many times the clock was polled while waiting.
    pub async fn admit(&mut self, characters: usize) -> u32 {
        let mut polls = 0;

        if let Some(blocked_minute) = self.window.window_start_minute
            && self.over_budget(characters as u64)
            && self.clock.current_minute() == blocked_minute
        {
            tracing::info!(
                requests = self.window.requests_in_window,
                characters = self.window.characters_in_window,
                "Rate budget exhausted, waiting for the next minute"
            );
            let started = std::time::Instant::now();
            while self.clock.current_minute() == blocked_minute {
                self.clock.sleep(self.limits.poll_interval).await;
                polls += 1;
            }
            tracing::debug!(
                waited = %humantime::format_duration(round_to_secs(started.elapsed())),
                "Rate budget released"
            );
        }

        let now = self.clock.current_minute();
        if self.window.window_start_minute != Some(now) {
            self.window = RateWindow::starting_at(now);
        }

        polls
    }

    /// Account for a successful call.
    pub fn record(&mut self, characters: usize) {
        let characters = characters as u64;
        self.window.requests_in_window += 1;
        self.window.characters_in_window += characters;
        self.total_requests += 1;
        self.total_characters += characters;
    }

    fn over_budget(&self, next_characters: u64) -> bool {
        let requests = self.window.requests_in_window;
        let characters = self.window.characters_in_window;
        match self.limits.mode {
            AdmissionMode::Lagging => {
                requests > self.limits.max_requests_per_minute
                    || characters > self.limits.max_characters_per_minute
            }
            AdmissionMode::Strict => {
                requests >= self.limits.max_requests_per_minute
                    || characters + next_characters > self.limits.max_characters_per_minute
            }
        }
    }
}

fn round_to_secs(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs())
}
