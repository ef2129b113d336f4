//! In-Memory Reference Ledger
//!
//! Implements the export contract against a process-local map, including
//! the optimistic-concurrency check a real ledger performs: a transition
//! computed against a stale status fails with `Conflict`. Used by tests and
//! for local composition without a ledger network.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core_types::{ExportId, OrgId};
use crate::lifecycle::action::Action;
use crate::lifecycle::status::ExportStatus;
use crate::lifecycle::table;
use crate::models::{DocumentCategory, DocumentRef, ExportRecord, NewExport, StagePatch};

use super::client::{LedgerClient, LedgerError};
use super::functions;

/// Process-local ledger with per-key atomic updates
#[derive(Default)]
pub struct InMemoryLedger {
    exports: DashMap<String, ExportRecord>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            exports: DashMap::new(),
        }
    }

    /// Number of records on the ledger
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn arg<'a>(args: &'a [String], idx: usize, name: &str) -> Result<&'a str, LedgerError> {
        args.get(idx)
            .map(|s| s.as_str())
            .ok_or_else(|| LedgerError::Rejected(format!("missing argument: {name}")))
    }

    fn encode(record: &ExportRecord) -> Result<Vec<u8>, LedgerError> {
        serde_json::to_vec(record).map_err(|e| LedgerError::Rejected(e.to_string()))
    }

    fn create_export(&self, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        let spec: NewExport = serde_json::from_str(Self::arg(args, 0, "new_export")?)
            .map_err(|e| LedgerError::Rejected(format!("malformed new_export: {e}")))?;
        let originating_org = OrgId::from(Self::arg(args, 1, "originating_org")?);

        let now = Self::now_ms();
        let record = ExportRecord {
            export_id: ExportId::new(),
            originating_org,
            status: ExportStatus::Draft,
            coffee_type: spec.coffee_type,
            quantity_kg: spec.quantity_kg,
            destination_country: spec.destination_country,
            estimated_value: spec.estimated_value,
            lot_number: None,
            license_number: None,
            quality_grade: None,
            quality_certificate_no: None,
            contract_number: None,
            fx_approval_id: None,
            fx_amount: None,
            payment_method: None,
            payment_amount: None,
            customs_declaration_no: None,
            vessel: None,
            voyage: None,
            bill_of_lading: None,
            documents: Default::default(),
            created_at: now,
            updated_at: now,
        };

        let bytes = Self::encode(&record)?;
        self.exports.insert(record.export_id.to_string(), record);
        Ok(bytes)
    }

    fn transition_export(&self, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        let export_id = Self::arg(args, 0, "export_id")?;
        let action: Action = serde_json::from_value(serde_json::Value::String(
            Self::arg(args, 1, "action")?.to_string(),
        ))
        .map_err(|_| LedgerError::Rejected(format!("unknown action: {}", args[1])))?;
        let expected: ExportStatus = Self::arg(args, 2, "expected_status")?
            .parse()
            .map_err(|e| LedgerError::Rejected(format!("{e}")))?;
        let new_status: ExportStatus = Self::arg(args, 3, "new_status")?
            .parse()
            .map_err(|e| LedgerError::Rejected(format!("{e}")))?;
        let patch: StagePatch = serde_json::from_str(Self::arg(args, 4, "patch")?)
            .map_err(|e| LedgerError::Rejected(format!("malformed patch: {e}")))?;

        // The contract enforces the same edge table the engine does;
        // a mismatch here means a buggy or byzantine caller.
        match table::lookup(expected, action) {
            Some(edge) if edge.to == new_status => {}
            _ => {
                return Err(LedgerError::Rejected(format!(
                    "no edge {expected} --{action}--> {new_status}"
                )));
            }
        }

        let mut entry = self
            .exports
            .get_mut(export_id)
            .ok_or_else(|| LedgerError::NotFound(export_id.to_string()))?;

        // Optimistic concurrency: the caller computed against `expected`
        if entry.status != expected {
            return Err(LedgerError::Conflict);
        }

        patch.apply_to(&mut entry);
        entry.status = new_status;
        entry.updated_at = Self::now_ms();
        Self::encode(&entry)
    }

    fn attach_document(&self, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        let export_id = Self::arg(args, 0, "export_id")?;
        let category: DocumentCategory = serde_json::from_value(serde_json::Value::String(
            Self::arg(args, 1, "category")?.to_string(),
        ))
        .map_err(|_| LedgerError::Rejected(format!("unknown category: {}", args[1])))?;
        let content_hash = Self::arg(args, 2, "content_hash")?.to_string();

        let mut entry = self
            .exports
            .get_mut(export_id)
            .ok_or_else(|| LedgerError::NotFound(export_id.to_string()))?;

        let now = Self::now_ms();
        let docs = entry.documents.entry(category).or_default();
        let version = docs.iter().map(|d| d.version).max().unwrap_or(0) + 1;
        // A new version supersedes the previous active one
        for doc in docs.iter_mut() {
            doc.is_active = false;
        }
        docs.push(DocumentRef {
            content_hash,
            version,
            timestamp_ms: now,
            is_active: true,
        });
        entry.updated_at = now;
        Self::encode(&entry)
    }

    fn deactivate_document(&self, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        let export_id = Self::arg(args, 0, "export_id")?;
        let category: DocumentCategory = serde_json::from_value(serde_json::Value::String(
            Self::arg(args, 1, "category")?.to_string(),
        ))
        .map_err(|_| LedgerError::Rejected(format!("unknown category: {}", args[1])))?;
        let version: u32 = Self::arg(args, 2, "version")?
            .parse()
            .map_err(|_| LedgerError::Rejected(format!("malformed version: {}", args[2])))?;

        let mut entry = self
            .exports
            .get_mut(export_id)
            .ok_or_else(|| LedgerError::NotFound(export_id.to_string()))?;

        let doc = entry
            .documents
            .get_mut(&category)
            .and_then(|docs| docs.iter_mut().find(|d| d.version == version))
            .ok_or_else(|| {
                LedgerError::Rejected(format!("no {category} document version {version}"))
            })?;
        doc.is_active = false;
        entry.updated_at = Self::now_ms();
        Self::encode(&entry)
    }

    fn read_export(&self, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        let export_id = Self::arg(args, 0, "export_id")?;
        let entry = self
            .exports
            .get(export_id)
            .ok_or_else(|| LedgerError::NotFound(export_id.to_string()))?;
        Self::encode(&entry)
    }

    fn list<F>(&self, predicate: F) -> Result<Vec<u8>, LedgerError>
    where
        F: Fn(&ExportRecord) -> bool,
    {
        let mut records: Vec<ExportRecord> = self
            .exports
            .iter()
            .filter(|e| predicate(e.value()))
            .map(|e| e.value().clone())
            .collect();
        records.sort_by_key(|r| r.export_id.inner());
        serde_json::to_vec(&records).map_err(|e| LedgerError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn evaluate(
        &self,
        _contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, LedgerError> {
        match function {
            functions::READ_EXPORT => self.read_export(args),
            functions::LIST_BY_STATUS => {
                let status: ExportStatus = Self::arg(args, 0, "status")?
                    .parse()
                    .map_err(|e| LedgerError::Rejected(format!("{e}")))?;
                self.list(|r| r.status == status)
            }
            functions::LIST_BY_ORG => {
                let org = Self::arg(args, 0, "org_id")?.to_string();
                self.list(|r| r.originating_org.as_str() == org)
            }
            other => Err(LedgerError::Rejected(format!(
                "not a query function: {other}"
            ))),
        }
    }

    async fn submit(
        &self,
        _contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, LedgerError> {
        match function {
            functions::CREATE_EXPORT => self.create_export(args),
            functions::TRANSITION_EXPORT => self.transition_export(args),
            functions::ATTACH_DOCUMENT => self.attach_document(args),
            functions::DEACTIVATE_DOCUMENT => self.deactivate_document(args),
            other => Err(LedgerError::Rejected(format!(
                "not a submit function: {other}"
            ))),
        }
    }
}
