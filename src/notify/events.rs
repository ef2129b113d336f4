//! Transition Events and Topics
//!
//! Events carry enough to render a live dashboard row; subscribers needing
//! full record state re-read through the store.

use serde::{Deserialize, Serialize};

use crate::core_types::{ExportId, OrgId, OrgKind};
use crate::lifecycle::status::ExportStatus;

/// Event published for every successful state-changing operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub export_id: ExportId,
    /// Wire spelling of the operation (`submitToExchange`, `createExport`,
    /// `attachDocument`, ...)
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<ExportStatus>,
    pub to_status: ExportStatus,
    /// Organization that performed the operation
    pub actor_org: OrgId,
    /// Bank that owns the export record
    pub originating_org: OrgId,
    pub timestamp_ms: i64,
}

/// Topic name derivation
pub mod topics {
    use super::*;

    pub fn export(id: &ExportId) -> String {
        format!("export.{id}")
    }

    /// Room shared by every service of an organization kind
    pub fn org_kind(kind: OrgKind) -> String {
        format!("org.{}", kind.as_str())
    }

    /// Room of one concrete organization (used for the originating bank)
    pub fn org(org: &OrgId) -> String {
        format!("org.{org}")
    }
}

impl TransitionEvent {
    /// Topics this event fans out to: the export's subscribers, the room of
    /// the organization expected to act next, and the originating bank.
    pub fn routes(&self) -> Vec<String> {
        let mut routes = vec![
            topics::export(&self.export_id),
            topics::org_kind(self.to_status.owner()),
            topics::org(&self.originating_org),
        ];
        routes.dedup();
        routes
    }
}
