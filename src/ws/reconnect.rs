//! Exponential backoff with jitter for stream reconnection

use rand::Rng;
use std::time::Duration;

/// Backoff parameters
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts
    pub max_delay: Duration,
    /// Growth factor applied after each attempt
    pub multiplier: f64,
    /// Fraction of each delay randomized in either direction
    pub jitter_factor: f64,
    /// Attempts allowed before giving up (0 = unlimited)
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_factor: 0.1,
            max_attempts: 0,
        }
    }
}

/// Tracks delay growth across consecutive failed connections
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        let current_delay = first_delay(&config);
        Self {
            config,
            current_delay,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt, or None once attempts run out
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }
        self.attempts += 1;

        let delay = self.jittered(self.current_delay);

        let max_ms = self.config.max_delay.as_millis() as f64;
        let grown_ms = (self.current_delay.as_millis() as f64 * self.config.multiplier).round();
        self.current_delay = if grown_ms.is_finite() {
            Duration::from_millis(grown_ms.min(max_ms) as u64)
        } else {
            self.config.max_delay
        };

        Some(delay)
    }

    /// Start over after a successful connection
    pub fn reset(&mut self) {
        self.current_delay = first_delay(&self.config);
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn should_retry(&self) -> bool {
        self.config.max_attempts == 0 || self.attempts < self.config.max_attempts
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return base;
        }
        let base_ms = base.as_millis() as f64;
        let spread = base_ms * self.config.jitter_factor;
        let offset: f64 = rand::rng().random_range(-spread..=spread);
        Duration::from_millis((base_ms + offset).max(1.0).round() as u64)
    }
}

/// Initial delay, never above the cap
fn first_delay(config: &ReconnectConfig) -> Duration {
    config.initial_delay.min(config.max_delay)
}
