//! Export record and document models
//!
//! The ledger stores records as JSON; these structs are the shared wire
//! shape between the engine, the cache and the in-memory reference ledger.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{ExportId, OrgId};
use crate::lifecycle::status::ExportStatus;

/// Document category tracked on an export
///
/// Each category is written by one organization family; versions within a
/// category are ledger-assigned, strictly increasing and gapless from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    /// Invoices, letters of credit, payment instruments
    Financial,
    /// Grading and inspection certificates
    Quality,
    /// Bills of lading, packing lists, transport documents
    Shipment,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Financial => "FINANCIAL",
            DocumentCategory::Quality => "QUALITY",
            DocumentCategory::Shipment => "SHIPMENT",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to an immutable blob in the external content-addressed store
///
/// Deactivation flips `is_active`; history is never removed and versions are
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// SHA-256 content hash, 64 lowercase hex chars
    pub content_hash: String,
    pub version: u32,
    pub timestamp_ms: i64,
    pub is_active: bool,
}

/// Settlement method agreed for the export contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    LetterOfCredit,
    CashAgainstDocuments,
    AdvancePayment,
    Consignment,
}

/// The export record - single source of truth lives on the ledger
///
/// Stage fields are written by exactly one organization's action and are
/// append-only: a later resubmission supersedes, nothing clears them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub export_id: ExportId,
    pub originating_org: OrgId,
    pub status: ExportStatus,

    // Base business fields, set at creation
    pub coffee_type: String,
    pub quantity_kg: u64,
    pub destination_country: String,
    pub estimated_value: Decimal,

    // Stage fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_certificate_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx_approval_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customs_declaration_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voyage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_of_lading: Option<String>,

    /// Per-category document history, newest version last
    #[serde(default)]
    pub documents: BTreeMap<DocumentCategory, Vec<DocumentRef>>,

    /// Ledger-assigned timestamps (millis)
    pub created_at: i64,
    pub updated_at: i64,
}

impl ExportRecord {
    /// Active document of a category, if any
    pub fn active_document(&self, category: DocumentCategory) -> Option<&DocumentRef> {
        self.documents
            .get(&category)?
            .iter()
            .rev()
            .find(|d| d.is_active)
    }

    /// Highest version ever assigned in a category (0 if none)
    pub fn latest_version(&self, category: DocumentCategory) -> u32 {
        self.documents
            .get(&category)
            .and_then(|docs| docs.iter().map(|d| d.version).max())
            .unwrap_or(0)
    }
}

impl fmt::Display for ExportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Export[{}] org={} {} {}kg -> {} status={}",
            self.export_id,
            self.originating_org,
            self.coffee_type,
            self.quantity_kg,
            self.destination_country,
            self.status
        )
    }
}

/// Creation request for a new DRAFT export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExport {
    pub coffee_type: String,
    pub quantity_kg: u64,
    pub destination_country: String,
    pub estimated_value: Decimal,
}

/// Partial update of stage fields carried by a transition
///
/// Only `Some` fields are written; the ledger never clears a field through a
/// patch, so stage data is superseded rather than erased.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coffee_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_kg: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_certificate_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx_approval_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customs_declaration_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voyage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_of_lading: Option<String>,
}

impl StagePatch {
    /// Apply the patch to a record, overwriting only present fields
    pub fn apply_to(&self, record: &mut ExportRecord) {
        macro_rules! merge_opt {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = &self.$field {
                    record.$field = Some(v.clone());
                })*
            };
        }
        if let Some(v) = &self.coffee_type {
            record.coffee_type = v.clone();
        }
        if let Some(v) = self.quantity_kg {
            record.quantity_kg = v;
        }
        if let Some(v) = &self.destination_country {
            record.destination_country = v.clone();
        }
        if let Some(v) = self.estimated_value {
            record.estimated_value = v;
        }
        merge_opt!(
            lot_number,
            license_number,
            quality_grade,
            quality_certificate_no,
            contract_number,
            fx_approval_id,
            customs_declaration_no,
            vessel,
            voyage,
            bill_of_lading,
        );
        if let Some(v) = self.fx_amount {
            record.fx_amount = Some(v);
        }
        if let Some(v) = self.payment_method {
            record.payment_method = Some(v);
        }
        if let Some(v) = self.payment_amount {
            record.payment_amount = Some(v);
        }
    }

    /// True when the patch writes nothing
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|v| v.as_object().map(|o| o.is_empty()).unwrap_or(true))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample_record() -> ExportRecord {
        ExportRecord {
            export_id: ExportId::new(),
            originating_org: OrgId::from("awash-bank"),
            status: ExportStatus::Draft,
            coffee_type: "Yirgacheffe".to_string(),
            quantity_kg: 18_000,
            destination_country: "DE".to_string(),
            estimated_value: Decimal::new(84_500_00, 2),
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
            documents: BTreeMap::new(),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record = sample_record();
        let bytes = serde_json::to_vec(&record).unwrap();
        let back: ExportRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn test_patch_supersedes_without_clearing() {
        let mut record = sample_record();
        record.lot_number = Some("ECX-2024-001".to_string());

        let patch = StagePatch {
            quality_grade: Some("Grade 1".to_string()),
            ..Default::default()
        };
        patch.apply_to(&mut record);

        assert_eq!(record.quality_grade.as_deref(), Some("Grade 1"));
        // Untouched stage fields survive
        assert_eq!(record.lot_number.as_deref(), Some("ECX-2024-001"));
    }

    #[test]
    fn test_patch_empty() {
        assert!(StagePatch::default().is_empty());
        let patch = StagePatch {
            vessel: Some("MV Abay".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_active_document_and_versions() {
        let mut record = sample_record();
        record.documents.insert(
            DocumentCategory::Quality,
            vec![
                DocumentRef {
                    content_hash: "a".repeat(64),
                    version: 1,
                    timestamp_ms: 1,
                    is_active: false,
                },
                DocumentRef {
                    content_hash: "b".repeat(64),
                    version: 2,
                    timestamp_ms: 2,
                    is_active: true,
                },
            ],
        );

        assert_eq!(record.latest_version(DocumentCategory::Quality), 2);
        assert_eq!(
            record
                .active_document(DocumentCategory::Quality)
                .unwrap()
                .version,
            2
        );
        assert_eq!(record.latest_version(DocumentCategory::Financial), 0);
        assert!(record.active_document(DocumentCategory::Shipment).is_none());
    }
}
