//! Circuit Breaker
//!
//! Per-operation breaker state for ledger submits. Counts consecutive
//! transport failures; once the threshold is reached the breaker opens and
//! calls fail fast for a cooldown window, then a single half-open probe
//! decides whether to close or re-open.
//!
//! Uses `tokio::time::Instant` so paused-clock tests can drive the cooldown.

use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Whether a call may proceed right now
    ///
    /// Returns `false` while open within the cooldown window and while a
    /// half-open probe is already in flight. The first acquire after the
    /// cooldown elapses becomes the probe.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let opened_at = self.opened_at.unwrap_or(now);
                if now.saturating_duration_since(opened_at) >= self.cooldown {
                    self.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
            // One probe at a time
            CircuitState::HalfOpen => false,
        }
    }

    /// The ledger answered - transport is healthy
    pub fn record_success(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    /// A transport failure occurred at `now`
    pub fn record_failure(&mut self, now: Instant) {
        match self.state {
            CircuitState::HalfOpen => {
                // Probe failed - back to open for a full cooldown
                self.state = CircuitState::Open;
                self.opened_at = Some(now);
            }
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.threshold {
                    self.state = CircuitState::Open;
                    self.opened_at = Some(now);
                }
            }
            CircuitState::Open => {}
        }
    }
}
