//! Delay policies between attempts after a transient provider error.
//!
//! Transient errors are retried without an attempt cap; the policy only
//! decides how long to wait before the next attempt.

use crate::defaults;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub trait RetryPolicy: Send + Sync {
    /// Delay before retry number `attempt` (1 for the first retry).
    fn delay_for(&self, attempt: u32) -> Duration;
}

/// Retry immediately, forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl RetryPolicy for Immediate {
    fn delay_for(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Doubling delay, capped at `max`, with optional equal jitter
/// (a random point in the upper half of the computed delay).
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
    pub jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(defaults::RETRY_INITIAL_DELAY_MS),
            max: Duration::from_millis(defaults::RETRY_MAX_DELAY_MS),
            jitter: true,
        }
    }
}

impl ExponentialBackoff {
    fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial
            .saturating_mul(1u32 << exponent)
            .min(self.max)
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }
        let ceiling_ms = ceiling.as_millis() as u64;
        let floor_ms = ceiling_ms / 2;
        Duration::from_millis(rand::rng().random_range(floor_ms..=ceiling_ms))
    }
}

/// Retry strategy as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    #[default]
    Exponential,
    Immediate,
}
