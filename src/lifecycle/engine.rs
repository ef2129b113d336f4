//! Status Transition Engine
//!
//! The orchestration entry point. Validates a requested transition against
//! the table, the actor's organization and the per-action payload schema,
//! then drives the ordered side effects: ledger submit, cache invalidation,
//! audit append, notification. The ledger is the only authority; cache and
//! audit are best-effort accelerants.
//!
//! Concurrency: no in-process lock is held across requests for an export.
//! Two racing writers for the same export are serialized by the ledger's
//! optimistic-concurrency check; the loser receives `LedgerConflict` and
//! must refetch before deciding to reapply.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{AuditKind, AuditTrail, StatusTransition};
use crate::cache::{RecordCache, Ttl, keys};
use crate::core_types::{ExportId, IdentityContext, OrgId, OrgKind};
use crate::error::ExportError;
use crate::ledger::ExportLedger;
use crate::models::{DocumentCategory, ExportRecord, NewExport};
use crate::notify::{EventQueue, TransitionEvent};

use super::action::{Action, ActionPayload};
use super::status::ExportStatus;
use super::table;

/// Operation names outside the transition table, used for audit and events
const OP_CREATE: &str = "createExport";
const OP_ATTACH_DOCUMENT: &str = "attachDocument";
const OP_DEACTIVATE_DOCUMENT: &str = "deactivateDocument";

pub struct StatusTransitionEngine {
    ledger: ExportLedger,
    cache: Arc<RecordCache>,
    audit: Arc<dyn AuditTrail>,
    events: Arc<EventQueue>,
    audit_append_failures: AtomicU64,
    dropped_events: AtomicU64,
}

impl StatusTransitionEngine {
    pub fn new(
        ledger: ExportLedger,
        cache: Arc<RecordCache>,
        audit: Arc<dyn AuditTrail>,
        events: Arc<EventQueue>,
    ) -> Self {
        Self {
            ledger,
            cache,
            audit,
            events,
            audit_append_failures: AtomicU64::new(0),
            dropped_events: AtomicU64::new(0),
        }
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Audit persistence failures since startup (metric, never an error)
    pub fn audit_append_failures(&self) -> u64 {
        self.audit_append_failures.load(Ordering::Relaxed)
    }

    /// Events dropped because the fanout queue was full
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Side-effect helpers
    // ------------------------------------------------------------------

    async fn record_audit(
        &self,
        export_id: &str,
        actor: &IdentityContext,
        kind: AuditKind,
        action: &str,
        from_status: Option<ExportStatus>,
        to_status: Option<ExportStatus>,
        success: bool,
        reason: Option<String>,
    ) {
        let entry = StatusTransition {
            entry_id: Uuid::new_v4(),
            export_id: export_id.to_string(),
            actor_id: actor.actor_id.clone(),
            actor_org: actor.org_id.clone(),
            kind,
            from_status,
            to_status,
            action: action.to_string(),
            timestamp_ms: Self::now_ms(),
            success,
            reason,
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
        };
        if let Err(e) = self.audit.append(entry).await {
            // A logging failure is itself logged and surfaced as a metric,
            // never as an error to the transition caller.
            self.audit_append_failures.fetch_add(1, Ordering::Relaxed);
            warn!(export_id, action, error = %e, "Audit append failed");
        }
    }

    /// Invalidate everything that could serve this export stale
    fn invalidate_cache(&self, export_id: &ExportId) {
        self.cache.delete(&keys::export(export_id));
        self.cache.delete_pattern(keys::LIST_PREFIX);
    }

    fn publish_event(
        &self,
        record: &ExportRecord,
        actor: &IdentityContext,
        action: &str,
        from_status: Option<ExportStatus>,
    ) {
        let event = TransitionEvent {
            export_id: record.export_id,
            action: action.to_string(),
            from_status,
            to_status: record.status,
            actor_org: actor.org_id.clone(),
            originating_org: record.originating_org.clone(),
            timestamp_ms: Self::now_ms(),
        };
        if self.events.push(event).is_err() {
            // At-most-once: a full queue drops the event, clients recover
            // by re-reading current state.
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            warn!(export_id = %record.export_id, action, "Event queue full, notification dropped");
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Cache-accelerated read, authoritative on miss
    pub async fn get_current(&self, export_id: &ExportId) -> Result<ExportRecord, ExportError> {
        self.get_current_with_deadline(export_id, None).await
    }

    pub async fn get_current_with_deadline(
        &self,
        export_id: &ExportId,
        deadline: Option<Instant>,
    ) -> Result<ExportRecord, ExportError> {
        let key = keys::export(export_id);
        if let Some(record) = self.cache.get::<ExportRecord>(&key) {
            debug!(export_id = %export_id, "Cache hit");
            return Ok(record);
        }
        let record = self.ledger.read(export_id, deadline).await?;
        self.cache.set(key, &record, Ttl::Short);
        Ok(record)
    }

    pub async fn list_by_status(
        &self,
        status: ExportStatus,
    ) -> Result<Vec<ExportRecord>, ExportError> {
        let key = keys::by_status(status);
        if let Some(records) = self.cache.get::<Vec<ExportRecord>>(&key) {
            return Ok(records);
        }
        let records = self.ledger.list_by_status(status, None).await?;
        self.cache.set(key, &records, Ttl::Medium);
        Ok(records)
    }

    pub async fn list_by_organization(
        &self,
        org: &OrgId,
    ) -> Result<Vec<ExportRecord>, ExportError> {
        let key = keys::by_org(org);
        if let Some(records) = self.cache.get::<Vec<ExportRecord>>(&key) {
            return Ok(records);
        }
        let records = self.ledger.list_by_org(org, None).await?;
        self.cache.set(key, &records, Ttl::Medium);
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Mint a new DRAFT export for the calling exporter bank
    pub async fn create(
        &self,
        actor: &IdentityContext,
        spec: NewExport,
    ) -> Result<ExportRecord, ExportError> {
        self.create_with_deadline(actor, spec, None).await
    }

    pub async fn create_with_deadline(
        &self,
        actor: &IdentityContext,
        spec: NewExport,
        deadline: Option<Instant>,
    ) -> Result<ExportRecord, ExportError> {
        if actor.org_kind != OrgKind::ExporterBank || !actor.role.can_write() {
            let err = ExportError::InvalidTransition {
                current: ExportStatus::Draft,
                allowed: vec![],
                reason: format!(
                    "organization {} may not create exports",
                    actor.org_kind
                ),
            };
            self.record_audit(
                "",
                actor,
                AuditKind::AuthRejection,
                OP_CREATE,
                None,
                None,
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err);
        }

        if let Err(err) = validate_new_export(&spec) {
            self.record_audit(
                "",
                actor,
                AuditKind::Creation,
                OP_CREATE,
                None,
                None,
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err);
        }

        match self.ledger.create(&spec, &actor.org_id, deadline).await {
            Ok(record) => {
                // New draft shows up in list queries
                self.cache.delete_pattern(keys::LIST_PREFIX);
                self.record_audit(
                    &record.export_id.to_string(),
                    actor,
                    AuditKind::Creation,
                    OP_CREATE,
                    None,
                    Some(record.status),
                    true,
                    None,
                )
                .await;
                self.publish_event(&record, actor, OP_CREATE, None);
                info!(export_id = %record.export_id, org = %actor.org_id, "Export created");
                Ok(record)
            }
            Err(err) => {
                self.record_audit(
                    "",
                    actor,
                    AuditKind::Creation,
                    OP_CREATE,
                    None,
                    None,
                    false,
                    Some(err.to_string()),
                )
                .await;
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Apply one lifecycle action - the single orchestration entry point
    pub async fn apply(
        &self,
        export_id: &ExportId,
        action: Action,
        actor: &IdentityContext,
        payload: &ActionPayload,
    ) -> Result<ExportRecord, ExportError> {
        self.apply_with_deadline(export_id, action, actor, payload, None)
            .await
    }

    pub async fn apply_with_deadline(
        &self,
        export_id: &ExportId,
        action: Action,
        actor: &IdentityContext,
        payload: &ActionPayload,
        deadline: Option<Instant>,
    ) -> Result<ExportRecord, ExportError> {
        let id_str = export_id.to_string();
        let action_str = action.as_str();

        // Payload schema before any side effect
        if payload.action() != action {
            let err = ExportError::ValidationFailed(format!(
                "payload carries {} but {} was requested",
                payload.action(),
                action
            ));
            self.record_audit(
                &id_str,
                actor,
                AuditKind::Transition,
                action_str,
                None,
                None,
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err);
        }
        if let Err(err) = payload.validate() {
            self.record_audit(
                &id_str,
                actor,
                AuditKind::Transition,
                action_str,
                None,
                None,
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err);
        }

        // Current status: cache-accelerated; the ledger's own concurrency
        // check backstops any staleness at submit time.
        let current = match self.get_current_with_deadline(export_id, deadline).await {
            Ok(record) => record,
            Err(err) => {
                self.record_audit(
                    &id_str,
                    actor,
                    AuditKind::Transition,
                    action_str,
                    None,
                    None,
                    false,
                    Some(err.to_string()),
                )
                .await;
                return Err(err);
            }
        };

        // Edge lookup
        let Some(edge) = table::lookup(current.status, action) else {
            let err = ExportError::InvalidTransition {
                current: current.status,
                allowed: table::allowed_actions(current.status),
                reason: format!("no edge for {action} from {}", current.status),
            };
            self.record_audit(
                &id_str,
                actor,
                AuditKind::Transition,
                action_str,
                Some(current.status),
                None,
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err);
        };

        // Authorization: organization kind, record ownership for bank
        // edges, and a writable role
        if let Err(err) = authorize_edge(edge.actor, actor, &current) {
            self.record_audit(
                &id_str,
                actor,
                AuditKind::AuthRejection,
                action_str,
                Some(current.status),
                Some(edge.to),
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err);
        }

        // 1. Ledger write through the gateway
        let patch = payload.stage_patch();
        match self
            .ledger
            .transition(export_id, action, current.status, edge.to, &patch, deadline)
            .await
        {
            Ok(updated) => {
                // 2. Cache invalidation, synchronous before we return
                self.invalidate_cache(export_id);
                // 3. Audit
                self.record_audit(
                    &id_str,
                    actor,
                    AuditKind::Transition,
                    action_str,
                    Some(current.status),
                    Some(updated.status),
                    true,
                    payload.reason().map(str::to_string),
                )
                .await;
                // 4. Notification
                self.publish_event(&updated, actor, action_str, Some(current.status));
                info!(
                    export_id = %export_id,
                    action = action_str,
                    from = %current.status,
                    to = %updated.status,
                    org = %actor.org_id,
                    "Transition applied"
                );
                Ok(updated)
            }
            Err(err) => {
                // Status unchanged on the ledger; record the failed attempt
                self.record_audit(
                    &id_str,
                    actor,
                    AuditKind::Transition,
                    action_str,
                    Some(current.status),
                    Some(edge.to),
                    false,
                    Some(err.to_string()),
                )
                .await;
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Attach a new document version in a category
    pub async fn attach_document(
        &self,
        export_id: &ExportId,
        actor: &IdentityContext,
        category: DocumentCategory,
        content_hash: &str,
    ) -> Result<ExportRecord, ExportError> {
        let id_str = export_id.to_string();

        if let Err(err) = validate_content_hash(content_hash) {
            self.record_audit(
                &id_str,
                actor,
                AuditKind::Document,
                OP_ATTACH_DOCUMENT,
                None,
                None,
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err);
        }

        let current = self.get_current(export_id).await?;
        if let Err(err) = authorize_document(category, actor, &current) {
            self.record_audit(
                &id_str,
                actor,
                AuditKind::AuthRejection,
                OP_ATTACH_DOCUMENT,
                Some(current.status),
                None,
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err);
        }

        match self
            .ledger
            .attach_document(export_id, category, content_hash, None)
            .await
        {
            Ok(updated) => {
                self.invalidate_cache(export_id);
                self.record_audit(
                    &id_str,
                    actor,
                    AuditKind::Document,
                    OP_ATTACH_DOCUMENT,
                    Some(updated.status),
                    Some(updated.status),
                    true,
                    Some(format!(
                        "{category} v{}",
                        updated.latest_version(category)
                    )),
                )
                .await;
                self.publish_event(&updated, actor, OP_ATTACH_DOCUMENT, None);
                Ok(updated)
            }
            Err(err) => {
                self.record_audit(
                    &id_str,
                    actor,
                    AuditKind::Document,
                    OP_ATTACH_DOCUMENT,
                    Some(current.status),
                    None,
                    false,
                    Some(err.to_string()),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Deactivate a document version; history is kept, the version is never
    /// reused
    pub async fn deactivate_document(
        &self,
        export_id: &ExportId,
        actor: &IdentityContext,
        category: DocumentCategory,
        version: u32,
    ) -> Result<ExportRecord, ExportError> {
        let id_str = export_id.to_string();

        let current = self.get_current(export_id).await?;
        if let Err(err) = authorize_document(category, actor, &current) {
            self.record_audit(
                &id_str,
                actor,
                AuditKind::AuthRejection,
                OP_DEACTIVATE_DOCUMENT,
                Some(current.status),
                None,
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err);
        }

        match self
            .ledger
            .deactivate_document(export_id, category, version, None)
            .await
        {
            Ok(updated) => {
                self.invalidate_cache(export_id);
                self.record_audit(
                    &id_str,
                    actor,
                    AuditKind::Document,
                    OP_DEACTIVATE_DOCUMENT,
                    Some(updated.status),
                    Some(updated.status),
                    true,
                    Some(format!("{category} v{version}")),
                )
                .await;
                self.publish_event(&updated, actor, OP_DEACTIVATE_DOCUMENT, None);
                Ok(updated)
            }
            Err(err) => {
                self.record_audit(
                    &id_str,
                    actor,
                    AuditKind::Document,
                    OP_DEACTIVATE_DOCUMENT,
                    Some(current.status),
                    None,
                    false,
                    Some(err.to_string()),
                )
                .await;
                Err(err)
            }
        }
    }
}

fn validate_new_export(spec: &NewExport) -> Result<(), ExportError> {
    if spec.coffee_type.trim().is_empty() {
        return Err(ExportError::ValidationFailed(
            "coffee_type must not be empty".to_string(),
        ));
    }
    if spec.destination_country.trim().is_empty() {
        return Err(ExportError::ValidationFailed(
            "destination_country must not be empty".to_string(),
        ));
    }
    if spec.quantity_kg == 0 {
        return Err(ExportError::ValidationFailed(
            "quantity_kg must be greater than zero".to_string(),
        ));
    }
    if spec.estimated_value <= rust_decimal::Decimal::ZERO {
        return Err(ExportError::ValidationFailed(
            "estimated_value must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_content_hash(hash: &str) -> Result<(), ExportError> {
    let valid = hash.len() == 64
        && !hash.chars().any(|c| c.is_ascii_uppercase())
        && hex::decode(hash).is_ok();
    if !valid {
        return Err(ExportError::ValidationFailed(
            "content_hash must be 64 lowercase hex characters".to_string(),
        ));
    }
    Ok(())
}

/// I2: the actor's organization must be the one authorized for the edge.
/// Edges owned by the exporter bank additionally require the actor to be
/// the record's originating bank.
fn authorize_edge(
    required: OrgKind,
    actor: &IdentityContext,
    record: &ExportRecord,
) -> Result<(), ExportError> {
    let action_allowed = actor.org_kind == required
        && (required != OrgKind::ExporterBank || actor.org_id == record.originating_org)
        && actor.role.can_write();
    if action_allowed {
        Ok(())
    } else {
        Err(ExportError::InvalidTransition {
            current: record.status,
            allowed: table::allowed_actions(record.status),
            reason: format!(
                "actor {} of {} is not authorized (requires {})",
                actor.actor_id, actor.org_kind, required
            ),
        })
    }
}

/// Category-scoped document authorization
fn authorize_document(
    category: DocumentCategory,
    actor: &IdentityContext,
    record: &ExportRecord,
) -> Result<(), ExportError> {
    let allowed = actor.role.can_write()
        && match category {
            DocumentCategory::Financial => {
                (actor.org_kind == OrgKind::ExporterBank
                    && actor.org_id == record.originating_org)
                    || actor.org_kind == OrgKind::CommercialBank
            }
            DocumentCategory::Quality => actor.org_kind == OrgKind::CoffeeAuthority,
            DocumentCategory::Shipment => actor.org_kind == OrgKind::ShippingLine,
        };
    if allowed {
        Ok(())
    } else {
        Err(ExportError::InvalidTransition {
            current: record.status,
            allowed: table::allowed_actions(record.status),
            reason: format!(
                "organization {} may not write {category} documents",
                actor.org_kind
            ),
        })
    }
}
