//! Registry configuration

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Registry service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Retry policy for transient store errors
    #[serde(default)]
    pub retry: RetryConfig,

    /// Upper bound on a single transaction attempt
    #[serde(with = "humantime_serde", default = "default_operation_timeout")]
    pub operation_timeout: Duration,

    /// Check the primary wallet rules before every commit
    #[serde(default = "default_verify_invariants")]
    pub verify_invariants: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            operation_timeout: default_operation_timeout(),
            verify_invariants: default_verify_invariants(),
        }
    }
}

/// Bounded retry with exponential backoff and jitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(with = "humantime_serde", default = "default_base_delay")]
    pub base_delay: Duration,

    #[serde(with = "humantime_serde", default = "default_max_delay")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (0-based):
    /// `min(base * 2^retry + uniform[0, base), max)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry));
        let jitter = self.base_delay.mul_f64(rand::thread_rng().gen::<f64>());
        exponential.saturating_add(jitter).min(self.max_delay)
    }
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_verify_invariants() -> bool {
    cfg!(debug_assertions)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_millis(50)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(1)
}
