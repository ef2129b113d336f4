//! Ledger Client Interface
//!
//! Narrow seam to the shared ledger. The core never talks to the ledger's
//! execution engine directly; organization services provide a concrete
//! client (Fabric-style SDK, gRPC bridge) and the crate ships an in-memory
//! reference implementation for tests and local composition.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a ledger client can surface
///
/// Only `Transport` is transient. Business rejections are never retried:
/// replaying them cannot change the outcome and could duplicate side
/// effects.
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    /// Network/unavailable - the call may not have reached the ledger
    #[error("ledger transport failure: {0}")]
    Transport(String),

    /// The ledger evaluated the transaction and rejected it
    #[error("ledger rejected transaction: {0}")]
    Rejected(String),

    /// Optimistic-concurrency check failed: the write was computed against
    /// a stale version of the record
    #[error("ledger version conflict")]
    Conflict,

    /// The referenced key does not exist on the ledger
    #[error("ledger key not found: {0}")]
    NotFound(String),
}

impl LedgerError {
    /// Whether the gateway may retry this failure
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transport(_))
    }
}

/// Abstract ledger access for a named contract
///
/// `evaluate` runs read-only queries; `submit` runs state-changing
/// transactions through the ledger's ordering/consensus path. Both return
/// the contract's raw response bytes (JSON in this deployment).
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn evaluate(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, LedgerError>;

    async fn submit(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LedgerError::Transport("connection reset".to_string()).is_transient());
        assert!(!LedgerError::Rejected("bad args".to_string()).is_transient());
        assert!(!LedgerError::Conflict.is_transient());
        assert!(!LedgerError::NotFound("k".to_string()).is_transient());
    }
}
