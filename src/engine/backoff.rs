//! Backoff policy for repeated server-issued resets
//!
//! The transport's reconnect backoff covers dropped connections; it does
//! nothing against a server that keeps issuing resets on a healthy stream.
//! This policy spaces out resync cycles instead: the first reset resyncs
//! immediately, consecutive resets inside the decay window double the delay
//! up to a cap, and a quiet period clears the strikes.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ResetBackoffConfig {
    pub base: Duration,
    pub max: Duration,
    pub decay: Duration,
}

impl Default for ResetBackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
            decay: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub struct ResetBackoff {
    config: ResetBackoffConfig,
    strikes: u32,
    last_reset: Option<Instant>,
}

impl ResetBackoff {
    pub fn new(config: ResetBackoffConfig) -> Self {
        Self {
            config,
            strikes: 0,
            last_reset: None,
        }
    }

    /// Record a reset at `now`. Strikes accumulated before a quiet period
    /// longer than the decay window are forgotten first.
    pub fn record(&mut self, now: Instant) {
        if let Some(last) = self.last_reset {
            if now.duration_since(last) > self.config.decay {
                self.strikes = 0;
            }
        }
        self.strikes = self.strikes.saturating_add(1);
        self.last_reset = Some(now);
    }

    /// Delay to wait before the next resync cycle.
    pub fn delay(&self) -> Duration {
        if self.strikes <= 1 {
            return Duration::ZERO;
        }
        let shift = (self.strikes - 2).min(6);
        self.config
            .base
            .saturating_mul(1u32 << shift)
            .min(self.config.max)
    }

    /// Forget all strikes (used on range change, which starts a fresh
    /// lifecycle rather than recovering from a misbehaving server).
    pub fn clear(&mut self) {
        self.strikes = 0;
        self.last_reset = None;
    }
}
