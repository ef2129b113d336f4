//! Orchestration Error Types
//!
//! Error codes are stable across the organization services so their HTTP
//! layers can translate without string matching.

use thiserror::Error;

use crate::lifecycle::action::Action;
use crate::lifecycle::status::ExportStatus;

/// Errors surfaced by the orchestration core
#[derive(Error, Debug, Clone)]
pub enum ExportError {
    #[error("Export not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {reason} (current status {current}, allowed: {allowed:?})")]
    InvalidTransition {
        current: ExportStatus,
        allowed: Vec<Action>,
        reason: String,
    },

    #[error("Payload validation failed: {0}")]
    ValidationFailed(String),

    #[error("Ledger rejected a conflicting concurrent write")]
    LedgerConflict,

    #[error("Ledger unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Circuit open for operation: {0}")]
    CircuitOpen(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExportError {
    /// Get the stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::NotFound(_) => "NOT_FOUND",
            ExportError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ExportError::ValidationFailed(_) => "VALIDATION_FAILED",
            ExportError::LedgerConflict => "LEDGER_CONFLICT",
            ExportError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ExportError::CircuitOpen(_) => "CIRCUIT_OPEN",
            ExportError::Internal(_) => "INTERNAL",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            ExportError::NotFound(_) => 404,
            ExportError::InvalidTransition { .. } => 409,
            ExportError::ValidationFailed(_) => 400,
            ExportError::LedgerConflict => 409,
            ExportError::ServiceUnavailable(_) | ExportError::CircuitOpen(_) => 503,
            ExportError::Internal(_) => 500,
        }
    }

    /// Whether the caller may usefully retry after backoff
    ///
    /// LedgerConflict is deliberately not retryable here: the caller must
    /// refetch current status and decide whether the action still applies.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ExportError::ServiceUnavailable(_) | ExportError::CircuitOpen(_)
        )
    }
}

impl From<crate::gateway::GatewayError> for ExportError {
    fn from(e: crate::gateway::GatewayError) -> Self {
        use crate::gateway::GatewayError;
        use crate::ledger::LedgerError;
        match e {
            GatewayError::CircuitOpen(op) => ExportError::CircuitOpen(op),
            GatewayError::Exhausted {
                operation,
                attempts,
                last_error,
            } => ExportError::ServiceUnavailable(format!(
                "{operation} failed after {attempts} attempts: {last_error}"
            )),
            GatewayError::DeadlineExceeded(op) => {
                ExportError::ServiceUnavailable(format!("deadline exceeded before {op} completed"))
            }
            GatewayError::Ledger(LedgerError::Conflict) => ExportError::LedgerConflict,
            GatewayError::Ledger(LedgerError::NotFound(key)) => ExportError::NotFound(key),
            // A rejection the engine did not predict is a contract/engine
            // disagreement, not a caller problem
            GatewayError::Ledger(LedgerError::Rejected(msg)) => ExportError::Internal(msg),
            GatewayError::Ledger(LedgerError::Transport(msg)) => {
                ExportError::ServiceUnavailable(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ExportError::NotFound("x".to_string()).code(),
            "NOT_FOUND"
        );
        assert_eq!(ExportError::LedgerConflict.code(), "LEDGER_CONFLICT");
        assert_eq!(
            ExportError::CircuitOpen("TransitionExport".to_string()).code(),
            "CIRCUIT_OPEN"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ExportError::NotFound("x".to_string()).http_status(), 404);
        assert_eq!(
            ExportError::ValidationFailed("missing reason".to_string()).http_status(),
            400
        );
        assert_eq!(ExportError::LedgerConflict.http_status(), 409);
        assert_eq!(
            ExportError::ServiceUnavailable("timeout".to_string()).http_status(),
            503
        );
    }

    #[test]
    fn test_retryable_marker() {
        assert!(ExportError::ServiceUnavailable("x".to_string()).retryable());
        assert!(ExportError::CircuitOpen("op".to_string()).retryable());
        assert!(!ExportError::LedgerConflict.retryable());
        assert!(!ExportError::ValidationFailed("x".to_string()).retryable());
    }
}
