//! Exponential backoff for push channel reconnection

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

/// Exponential backoff configuration
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Initial delay in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential growth
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl From<&ReconnectConfig> for BackoffConfig {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            initial_delay_ms: config.initial_delay_ms,
            max_delay_ms: config.max_delay_ms,
            ..Default::default()
        }
    }
}

/// Exponential backoff calculator with jitter.
///
/// The first delay equals `initial_delay_ms`; each later one grows by
/// `multiplier` up to `max_delay_ms`.
pub struct ExponentialBackoff {
    config: BackoffConfig,
    next_base_ms: u64,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        let initial = config.initial_delay_ms;
        Self {
            config,
            next_base_ms: initial,
            attempt: 0,
        }
    }

    /// Get the next delay duration
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;

        let base = (self.next_base_ms as f64).min(self.config.max_delay_ms as f64);

        let delay = if self.config.jitter_factor > 0.0 && base > 0.0 {
            let jitter_range = base * self.config.jitter_factor;
            let jitter = rand::rng().random_range(-jitter_range..jitter_range);
            (base + jitter).clamp(1.0, self.config.max_delay_ms.max(1) as f64) as u64
        } else {
            base.max(1.0) as u64
        };

        let grown = base * self.config.multiplier;
        self.next_base_ms = grown.min(self.config.max_delay_ms as f64) as u64;

        Duration::from_millis(delay)
    }

    /// Reset the backoff to initial state
    pub fn reset(&mut self) {
        self.next_base_ms = self.config.initial_delay_ms;
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}
