// Retry strategies for message publishing: linear and exponential backoff,
// plus the sleep abstraction used between attempts

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of delivery attempts per message
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry strategy trait for calculating delays between attempts.
///
/// Attempts are numbered from 1. `delay_after(n)` is the wait inserted after
/// attempt `n` failed and before attempt `n + 1` starts.
pub trait RetryStrategy: Send + Sync {
    /// Delay to wait after `attempt` failed
    fn delay_after(&self, attempt: u32) -> Duration;

    /// Total number of attempts allowed, including the first one
    fn max_attempts(&self) -> u32 {
        DEFAULT_MAX_ATTEMPTS
    }

    /// Whether another attempt may follow `attempt`
    fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }
}

/// Backoff flavour selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Linear,
    Exponential,
}

/// Linear backoff: `attempt × base_delay`
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base_delay: Duration,
    max_attempts: u32,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl LinearBackoff {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl RetryStrategy for LinearBackoff {
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Exponential backoff with jitter.
/// Sequence before jitter: base, 2·base, 4·base, ... capped at `max_delay_ms`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Base delay in milliseconds
    base_delay_ms: u64,
    /// Maximum delay in milliseconds
    max_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0)
    jitter_factor: f64,
    max_attempts: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_factor: 0.1, // 10% jitter
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(
        base_delay_ms: u64,
        max_delay_ms: u64,
        jitter_factor: f64,
        max_attempts: u32,
    ) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
            jitter_factor: jitter_factor.clamp(0.0, 1.0),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Exponential delay without jitter
    fn calculate_base_delay(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self.base_delay_ms.saturating_mul(2_u64.saturating_pow(exponent));
        delay.min(self.max_delay_ms)
    }

    /// Random jitter so that many failing events do not retry in lockstep
    fn add_jitter_ms(&self, base_delay_ms: u64) -> u64 {
        if self.jitter_factor == 0.0 {
            return base_delay_ms;
        }

        let jitter_range_ms = (base_delay_ms as f64 * self.jitter_factor) as u64;
        let jitter_ms = if jitter_range_ms > 0 {
            rand::thread_rng().gen_range(0..=jitter_range_ms)
        } else {
            0
        };

        base_delay_ms + jitter_ms
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn delay_after(&self, attempt: u32) -> Duration {
        let base_delay_ms = self.calculate_base_delay(attempt);
        Duration::from_millis(self.add_jitter_ms(base_delay_ms))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Sleep abstraction so retry loops can be driven without real delays
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
