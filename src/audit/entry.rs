//! Audit Entry Types
//!
//! One immutable entry per attempted action, successful or not. Entries are
//! never mutated or deleted inside the retention window.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_types::OrgId;
use crate::lifecycle::status::ExportStatus;

/// Classification of an audit entry, drives the retention tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    /// A state-machine transition attempt
    Transition,
    /// An attempt rejected for authorization reasons - security relevant,
    /// retained longer
    AuthRejection,
    /// Document attach/deactivate
    Document,
    /// Export record creation
    Creation,
}

/// Immutable record of one attempted action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub entry_id: Uuid,
    pub export_id: String,
    pub actor_id: String,
    pub actor_org: OrgId,
    pub kind: AuditKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<ExportStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<ExportStatus>,
    /// Wire spelling of the attempted action
    pub action: String,
    pub timestamp_ms: i64,
    pub success: bool,
    /// Rejection cause or business reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Best-effort filter for compliance queries
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub export_id: Option<String>,
    pub actor_org: Option<OrgId>,
    pub action: Option<String>,
    pub success: Option<bool>,
    pub since_ms: Option<i64>,
    pub until_ms: Option<i64>,
}

impl AuditFilter {
    pub fn for_export(export_id: impl Into<String>) -> Self {
        Self {
            export_id: Some(export_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, entry: &StatusTransition) -> bool {
        if let Some(id) = &self.export_id {
            if &entry.export_id != id {
                return false;
            }
        }
        if let Some(org) = &self.actor_org {
            if &entry.actor_org != org {
                return false;
            }
        }
        if let Some(action) = &self.action {
            if &entry.action != action {
                return false;
            }
        }
        if let Some(success) = self.success {
            if entry.success != success {
                return false;
            }
        }
        if let Some(since) = self.since_ms {
            if entry.timestamp_ms < since {
                return false;
            }
        }
        if let Some(until) = self.until_ms {
            if entry.timestamp_ms > until {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(export_id: &str, action: &str, success: bool) -> StatusTransition {
        StatusTransition {
            entry_id: Uuid::new_v4(),
            export_id: export_id.to_string(),
            actor_id: "user-1".to_string(),
            actor_org: OrgId::from("awash"),
            kind: AuditKind::Transition,
            from_status: Some(ExportStatus::Draft),
            to_status: Some(ExportStatus::ExchangePending),
            action: action.to_string(),
            timestamp_ms: 1_000,
            success,
            reason: None,
            ip_address: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_filter_by_export_and_outcome() {
        let e = entry("exp-1", "submitToExchange", true);

        assert!(AuditFilter::for_export("exp-1").matches(&e));
        assert!(!AuditFilter::for_export("exp-2").matches(&e));

        let failed_only = AuditFilter {
            success: Some(false),
            ..Default::default()
        };
        assert!(!failed_only.matches(&e));
    }

    #[test]
    fn test_filter_time_window() {
        let e = entry("exp-1", "cancel", true);
        let window = AuditFilter {
            since_ms: Some(500),
            until_ms: Some(1_500),
            ..Default::default()
        };
        assert!(window.matches(&e));

        let before = AuditFilter {
            until_ms: Some(999),
            ..Default::default()
        };
        assert!(!before.matches(&e));
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(AuditFilter::default().matches(&entry("x", "cancel", false)));
    }
}
