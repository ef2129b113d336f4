//! Audit Trail Sink
//!
//! Append-only store of transition attempts. Persistence failures never
//! fail the caller's business response: the engine logs and counts them
//! instead (see `StatusTransitionEngine::audit_append_failures`).

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Duration;

use crate::config::AuditConfig;

use super::entry::{AuditFilter, AuditKind, StatusTransition};

#[derive(Error, Debug, Clone)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Append-only audit sink
///
/// `query` is best-effort for compliance reporting and is not guaranteed
/// transactionally consistent with the ledger.
#[async_trait]
pub trait AuditTrail: Send + Sync {
    async fn append(&self, entry: StatusTransition) -> Result<(), AuditError>;

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<StatusTransition>, AuditError>;
}

/// In-memory trail with retention-tier pruning
pub struct InMemoryAuditTrail {
    entries: Mutex<Vec<StatusTransition>>,
    retention: Duration,
    security_retention: Duration,
}

impl InMemoryAuditTrail {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            retention: Duration::from_secs(config.retention_days * 24 * 3600),
            security_retention: Duration::from_secs(config.security_retention_days * 24 * 3600),
        }
    }

    /// Drop entries past their retention tier; returns how many were removed
    ///
    /// AuthRejection entries use the longer security tier.
    pub fn prune(&self, now_ms: i64) -> usize {
        let mut entries = self.entries.lock().expect("audit mutex poisoned");
        let before = entries.len();
        let retention_ms = self.retention.as_millis() as i64;
        let security_ms = self.security_retention.as_millis() as i64;
        entries.retain(|e| {
            let keep_for = if e.kind == AuditKind::AuthRejection {
                security_ms
            } else {
                retention_ms
            };
            now_ms - e.timestamp_ms < keep_for
        });
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditTrail for InMemoryAuditTrail {
    async fn append(&self, entry: StatusTransition) -> Result<(), AuditError> {
        self.entries
            .lock()
            .map_err(|_| AuditError::Unavailable("audit mutex poisoned".to_string()))?
            .push(entry);
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<StatusTransition>, AuditError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AuditError::Unavailable("audit mutex poisoned".to_string()))?;
        Ok(entries.iter().filter(|e| filter.matches(e)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::OrgId;
    use uuid::Uuid;

    fn config() -> AuditConfig {
        AuditConfig {
            retention_days: 90,
            security_retention_days: 365,
        }
    }

    fn entry(kind: AuditKind, timestamp_ms: i64) -> StatusTransition {
        StatusTransition {
            entry_id: Uuid::new_v4(),
            export_id: "exp-1".to_string(),
            actor_id: "user-1".to_string(),
            actor_org: OrgId::from("awash"),
            kind,
            from_status: None,
            to_status: None,
            action: "submitToExchange".to_string(),
            timestamp_ms,
            success: false,
            reason: Some("wrong organization".to_string()),
            ip_address: None,
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn test_append_and_query() {
        let trail = InMemoryAuditTrail::new(&config());
        trail.append(entry(AuditKind::Transition, 100)).await.unwrap();
        trail.append(entry(AuditKind::AuthRejection, 200)).await.unwrap();

        let all = trail.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let failed = trail
            .query(&AuditFilter {
                success: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(failed.len(), 2);
    }

    #[tokio::test]
    async fn test_prune_respects_security_tier() {
        let trail = InMemoryAuditTrail::new(&config());
        let day_ms: i64 = 24 * 3600 * 1000;

        // 100 days old: past normal retention, within the security tier
        trail.append(entry(AuditKind::Transition, 0)).await.unwrap();
        trail.append(entry(AuditKind::AuthRejection, 0)).await.unwrap();

        let removed = trail.prune(100 * day_ms);
        assert_eq!(removed, 1);
        let rest = trail.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].kind, AuditKind::AuthRejection);

        // 400 days: everything out of retention
        trail.prune(400 * day_ms);
        assert!(trail.is_empty());
    }
}
