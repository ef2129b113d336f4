//! Resilient Ledger Gateway
//!
//! Every ledger call - read or write - flows through here. Transient
//! transport failures are retried with exponential backoff inside a
//! per-attempt timeout; writes additionally run behind a per-operation
//! circuit breaker. Business rejections from the ledger are never retried:
//! replaying them cannot change the outcome and could duplicate side
//! effects.

pub mod breaker;

use std::sync::Arc;

use dashmap::DashMap;
use rand::Rng;
use thiserror::Error;
use tokio::time::{Duration, Instant, sleep, timeout};
use tracing::{debug, warn};

use crate::config::GatewayPolicyConfig;
use crate::ledger::{LedgerClient, LedgerError};

use breaker::CircuitBreaker;

/// Gateway retry/timeout/breaker tuning, resolved from config
#[derive(Debug, Clone)]
pub struct GatewayPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
    pub breaker_threshold: u32,
    pub breaker_cooldown: Duration,
}

impl From<&GatewayPolicyConfig> for GatewayPolicy {
    fn from(cfg: &GatewayPolicyConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            attempt_timeout: Duration::from_millis(cfg.attempt_timeout_ms),
            breaker_threshold: cfg.breaker_threshold,
            breaker_cooldown: Duration::from_millis(cfg.breaker_cooldown_ms),
        }
    }
}

/// Gateway-level failures, translated by the engine into the public
/// error taxonomy
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("circuit open for operation {0}")]
    CircuitOpen(String),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("deadline exceeded before {0} completed")]
    DeadlineExceeded(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Clone, Copy, PartialEq)]
enum CallKind {
    Query,
    Submit,
}

/// Retry/timeout/breaker wrapper around a [`LedgerClient`]
pub struct ResilientLedgerGateway {
    client: Arc<dyn LedgerClient>,
    policy: GatewayPolicy,
    /// Breaker per logical operation (contract function name), writes only
    breakers: DashMap<String, CircuitBreaker>,
}

impl ResilientLedgerGateway {
    pub fn new(client: Arc<dyn LedgerClient>, policy: GatewayPolicy) -> Self {
        Self {
            client,
            policy,
            breakers: DashMap::new(),
        }
    }

    /// Execute a read-only query with retries
    pub async fn query(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>, GatewayError> {
        self.call(CallKind::Query, contract, function, args, deadline)
            .await
    }

    /// Execute a state-changing submit with retries behind the breaker
    pub async fn submit(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>, GatewayError> {
        if !self.breaker_acquire(function) {
            debug!(operation = function, "Breaker open, failing fast");
            return Err(GatewayError::CircuitOpen(function.to_string()));
        }
        self.call(CallKind::Submit, contract, function, args, deadline)
            .await
    }

    async fn call(
        &self,
        kind: CallKind,
        contract: &str,
        function: &str,
        args: &[String],
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>, GatewayError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            // A caller deadline shortens, never lengthens, the per-attempt
            // timeout.
            let now = Instant::now();
            let mut per_attempt = self.policy.attempt_timeout;
            if let Some(d) = deadline {
                if d <= now {
                    return Err(GatewayError::DeadlineExceeded(function.to_string()));
                }
                per_attempt = per_attempt.min(d.saturating_duration_since(now));
            }

            let fut = match kind {
                CallKind::Query => self.client.evaluate(contract, function, args),
                CallKind::Submit => self.client.submit(contract, function, args),
            };
            let result = match timeout(per_attempt, fut).await {
                Ok(r) => r,
                Err(_) => Err(LedgerError::Transport(format!(
                    "attempt timed out after {per_attempt:?}"
                ))),
            };

            match result {
                Ok(bytes) => {
                    if kind == CallKind::Submit {
                        self.breaker_record(function, true);
                    }
                    return Ok(bytes);
                }
                Err(e) if e.is_transient() => {
                    if kind == CallKind::Submit {
                        self.breaker_record(function, false);
                    }
                    warn!(
                        operation = function,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "Transient ledger failure"
                    );
                    if attempt >= self.policy.max_attempts {
                        return Err(GatewayError::Exhausted {
                            operation: function.to_string(),
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                    let delay = self.backoff_delay(attempt);
                    if let Some(d) = deadline {
                        if Instant::now() + delay >= d {
                            return Err(GatewayError::DeadlineExceeded(function.to_string()));
                        }
                    }
                    sleep(delay).await;
                }
                Err(e) => {
                    // Business outcome: the ledger answered, so transport is
                    // healthy even though the transaction was refused.
                    if kind == CallKind::Submit {
                        self.breaker_record(function, true);
                    }
                    return Err(GatewayError::Ledger(e));
                }
            }
        }
    }

    /// Exponential backoff with jitter: base * 2^(attempt-1), capped
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let raw = self
            .policy
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.policy.max_delay);
        let jitter_us = rand::thread_rng().gen_range(0..=raw.as_micros().max(1) / 4) as u64;
        raw + Duration::from_micros(jitter_us)
    }

    fn breaker_acquire(&self, function: &str) -> bool {
        let mut breaker = self
            .breakers
            .entry(function.to_string())
            .or_insert_with(|| {
                CircuitBreaker::new(self.policy.breaker_threshold, self.policy.breaker_cooldown)
            });
        breaker.try_acquire(Instant::now())
    }

    fn breaker_record(&self, function: &str, success: bool) {
        if let Some(mut breaker) = self.breakers.get_mut(function) {
            if success {
                breaker.record_success();
            } else {
                breaker.record_failure(Instant::now());
            }
        }
    }

    /// Current breaker state for an operation, for health reporting
    pub fn breaker_state(&self, function: &str) -> Option<breaker::CircuitState> {
        self.breakers.get(function).map(|b| b.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    const CONTRACT: &str = "exportlifecycle";
    const OP: &str = "TransitionExport";

    /// Fails the first `fail_first` calls with a transport error, then
    /// succeeds
    struct FlakyClient {
        fail_first: u32,
        calls: AtomicU32,
    }

    impl FlakyClient {
        fn new(fail_first: u32) -> Self {
            Self {
                fail_first,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond(&self) -> Result<Vec<u8>, LedgerError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(LedgerError::Transport("connection refused".to_string()))
            } else {
                Ok(b"ok".to_vec())
            }
        }
    }

    #[async_trait]
    impl LedgerClient for FlakyClient {
        async fn evaluate(
            &self,
            _contract: &str,
            _function: &str,
            _args: &[String],
        ) -> Result<Vec<u8>, LedgerError> {
            self.respond()
        }

        async fn submit(
            &self,
            _contract: &str,
            _function: &str,
            _args: &[String],
        ) -> Result<Vec<u8>, LedgerError> {
            self.respond()
        }
    }

    /// Always rejects with a business error
    struct RejectingClient;

    #[async_trait]
    impl LedgerClient for RejectingClient {
        async fn evaluate(
            &self,
            _contract: &str,
            _function: &str,
            _args: &[String],
        ) -> Result<Vec<u8>, LedgerError> {
            Err(LedgerError::Conflict)
        }

        async fn submit(
            &self,
            _contract: &str,
            _function: &str,
            _args: &[String],
        ) -> Result<Vec<u8>, LedgerError> {
            Err(LedgerError::Conflict)
        }
    }

    fn policy(max_attempts: u32, threshold: u32) -> GatewayPolicy {
        GatewayPolicy {
            max_attempts,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            attempt_timeout: Duration::from_millis(500),
            breaker_threshold: threshold,
            breaker_cooldown: Duration::from_secs(30),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retried_until_success() {
        // Three transport failures, success on the fourth attempt - within
        // both the attempt budget and the breaker threshold.
        let client = Arc::new(FlakyClient::new(3));
        let gateway = ResilientLedgerGateway::new(client.clone(), policy(4, 5));

        let out = gateway.submit(CONTRACT, OP, &[], None).await.unwrap();
        assert_eq!(out, b"ok");
        assert_eq!(client.calls(), 4);
        assert_eq!(
            gateway.breaker_state(OP),
            Some(breaker::CircuitState::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_max_attempts() {
        let client = Arc::new(FlakyClient::new(u32::MAX));
        let gateway = ResilientLedgerGateway::new(client.clone(), policy(3, 100));

        let err = gateway.query(CONTRACT, "ReadExport", &[], None).await;
        assert!(matches!(err, Err(GatewayError::Exhausted { attempts: 3, .. })));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_opens_and_fails_fast() {
        let client = Arc::new(FlakyClient::new(u32::MAX));
        let gateway = ResilientLedgerGateway::new(client.clone(), policy(3, 5));

        // Two calls: 3 + 2-of-3 transport failures cross the threshold
        let _ = gateway.submit(CONTRACT, OP, &[], None).await;
        let _ = gateway.submit(CONTRACT, OP, &[], None).await;
        assert_eq!(gateway.breaker_state(OP), Some(breaker::CircuitState::Open));

        let calls_before = client.calls();
        let err = gateway.submit(CONTRACT, OP, &[], None).await;
        assert!(matches!(err, Err(GatewayError::CircuitOpen(_))));
        // The ledger was not contacted
        assert_eq!(client.calls(), calls_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_half_open_probe_recovers() {
        let client = Arc::new(FlakyClient::new(5));
        let gateway = ResilientLedgerGateway::new(client.clone(), policy(5, 5));

        // One call burns through 5 failures then has no attempts left
        let _ = gateway.submit(CONTRACT, OP, &[], None).await;
        assert_eq!(gateway.breaker_state(OP), Some(breaker::CircuitState::Open));

        // Before cooldown: fail fast
        let err = gateway.submit(CONTRACT, OP, &[], None).await;
        assert!(matches!(err, Err(GatewayError::CircuitOpen(_))));

        // After cooldown the probe goes through and the client has healed
        tokio::time::advance(Duration::from_secs(30)).await;
        let out = gateway.submit(CONTRACT, OP, &[], None).await.unwrap();
        assert_eq!(out, b"ok");
        assert_eq!(
            gateway.breaker_state(OP),
            Some(breaker::CircuitState::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_business_errors_not_retried_and_no_breaker_trip() {
        let gateway = ResilientLedgerGateway::new(Arc::new(RejectingClient), policy(5, 2));

        for _ in 0..4 {
            let err = gateway.submit(CONTRACT, OP, &[], None).await;
            assert!(matches!(
                err,
                Err(GatewayError::Ledger(LedgerError::Conflict))
            ));
        }
        // Breaker saw healthy transport throughout
        assert_eq!(
            gateway.breaker_state(OP),
            Some(breaker::CircuitState::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_queries_do_not_touch_the_breaker() {
        let client = Arc::new(FlakyClient::new(u32::MAX));
        let gateway = ResilientLedgerGateway::new(client, policy(2, 2));

        let _ = gateway.query(CONTRACT, "ReadExport", &[], None).await;
        let _ = gateway.query(CONTRACT, "ReadExport", &[], None).await;
        assert_eq!(gateway.breaker_state("ReadExport"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_aborts_before_calling() {
        let client = Arc::new(FlakyClient::new(0));
        let gateway = ResilientLedgerGateway::new(client.clone(), policy(3, 5));

        let past = Instant::now() - Duration::from_millis(1);
        let err = gateway.query(CONTRACT, "ReadExport", &[], Some(past)).await;
        assert!(matches!(err, Err(GatewayError::DeadlineExceeded(_))));
        assert_eq!(client.calls(), 0);
    }
}
