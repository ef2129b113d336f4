//! Export Status Definitions
//!
//! The closed set of lifecycle states an export moves through. The ledger
//! stores the canonical SCREAMING_SNAKE string; legacy alias spellings from
//! older contract versions are accepted at the parse boundary only and never
//! propagate into the state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core_types::OrgKind;

/// Export lifecycle status
///
/// Every stage follows the same shape: a submission moves the export into a
/// `*_PENDING` state owned by the reviewing organization, which either
/// approves or rejects it. Terminal states: COMPLETED, CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    Draft,
    ExchangePending,
    ExchangeVerified,
    ExchangeRejected,
    LicensePending,
    LicenseApproved,
    LicenseRejected,
    QualityPending,
    #[serde(alias = "QUALITY_CERTIFIED")]
    QualityApproved,
    QualityRejected,
    ContractPending,
    ContractApproved,
    ContractRejected,
    BankDocPending,
    BankDocVerified,
    BankDocRejected,
    FxPending,
    #[serde(alias = "FX_GRANTED")]
    FxApproved,
    FxRejected,
    CustomsPending,
    #[serde(alias = "CUSTOMS_APPROVED")]
    CustomsCleared,
    CustomsRejected,
    ShipmentScheduled,
    Shipped,
    Arrived,
    Delivered,
    PaymentReceived,
    Completed,
    Cancelled,
}

impl ExportStatus {
    /// Canonical ledger spelling of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Draft => "DRAFT",
            ExportStatus::ExchangePending => "EXCHANGE_PENDING",
            ExportStatus::ExchangeVerified => "EXCHANGE_VERIFIED",
            ExportStatus::ExchangeRejected => "EXCHANGE_REJECTED",
            ExportStatus::LicensePending => "LICENSE_PENDING",
            ExportStatus::LicenseApproved => "LICENSE_APPROVED",
            ExportStatus::LicenseRejected => "LICENSE_REJECTED",
            ExportStatus::QualityPending => "QUALITY_PENDING",
            ExportStatus::QualityApproved => "QUALITY_APPROVED",
            ExportStatus::QualityRejected => "QUALITY_REJECTED",
            ExportStatus::ContractPending => "CONTRACT_PENDING",
            ExportStatus::ContractApproved => "CONTRACT_APPROVED",
            ExportStatus::ContractRejected => "CONTRACT_REJECTED",
            ExportStatus::BankDocPending => "BANK_DOC_PENDING",
            ExportStatus::BankDocVerified => "BANK_DOC_VERIFIED",
            ExportStatus::BankDocRejected => "BANK_DOC_REJECTED",
            ExportStatus::FxPending => "FX_PENDING",
            ExportStatus::FxApproved => "FX_APPROVED",
            ExportStatus::FxRejected => "FX_REJECTED",
            ExportStatus::CustomsPending => "CUSTOMS_PENDING",
            ExportStatus::CustomsCleared => "CUSTOMS_CLEARED",
            ExportStatus::CustomsRejected => "CUSTOMS_REJECTED",
            ExportStatus::ShipmentScheduled => "SHIPMENT_SCHEDULED",
            ExportStatus::Shipped => "SHIPPED",
            ExportStatus::Arrived => "ARRIVED",
            ExportStatus::Delivered => "DELIVERED",
            ExportStatus::PaymentReceived => "PAYMENT_RECEIVED",
            ExportStatus::Completed => "COMPLETED",
            ExportStatus::Cancelled => "CANCELLED",
        }
    }

    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Completed | ExportStatus::Cancelled)
    }

    /// Check if this is a stage-rejection state
    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            ExportStatus::ExchangeRejected
                | ExportStatus::LicenseRejected
                | ExportStatus::QualityRejected
                | ExportStatus::ContractRejected
                | ExportStatus::BankDocRejected
                | ExportStatus::FxRejected
                | ExportStatus::CustomsRejected
        )
    }

    /// Check if the export has not yet entered the shipment phase
    ///
    /// Cancellation by the originating bank is only possible here.
    #[inline]
    pub fn is_pre_shipment(&self) -> bool {
        !matches!(
            self,
            ExportStatus::ShipmentScheduled
                | ExportStatus::Shipped
                | ExportStatus::Arrived
                | ExportStatus::Delivered
                | ExportStatus::PaymentReceived
                | ExportStatus::Completed
                | ExportStatus::Cancelled
        )
    }

    /// The organization expected to act next in this status
    ///
    /// Drives the destination room for transition notifications. Terminal
    /// states route back to the originating bank, which owns the outcome.
    pub fn owner(&self) -> OrgKind {
        match self {
            ExportStatus::Draft
            | ExportStatus::ExchangeRejected
            | ExportStatus::ExchangeVerified
            | ExportStatus::LicenseRejected
            | ExportStatus::LicenseApproved
            | ExportStatus::QualityRejected
            | ExportStatus::QualityApproved
            | ExportStatus::ContractRejected
            | ExportStatus::ContractApproved
            | ExportStatus::BankDocRejected
            | ExportStatus::FxApproved
            | ExportStatus::FxRejected
            | ExportStatus::CustomsRejected
            | ExportStatus::Completed
            | ExportStatus::Cancelled => OrgKind::ExporterBank,
            ExportStatus::ExchangePending => OrgKind::CommodityExchange,
            ExportStatus::LicensePending
            | ExportStatus::QualityPending
            | ExportStatus::ContractPending => OrgKind::CoffeeAuthority,
            ExportStatus::BankDocPending
            | ExportStatus::BankDocVerified
            | ExportStatus::Delivered => OrgKind::CommercialBank,
            ExportStatus::FxPending | ExportStatus::PaymentReceived => OrgKind::NationalBank,
            ExportStatus::CustomsPending => OrgKind::Customs,
            ExportStatus::CustomsCleared
            | ExportStatus::ShipmentScheduled
            | ExportStatus::Shipped
            | ExportStatus::Arrived => OrgKind::ShippingLine,
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExportStatus {
    type Err = UnknownStatus;

    /// Parse a canonical status name or a legacy alias
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Legacy aliases from pre-consolidation contract versions
        let canonical = match s {
            "QUALITY_CERTIFIED" => "QUALITY_APPROVED",
            "CUSTOMS_APPROVED" => "CUSTOMS_CLEARED",
            "FX_GRANTED" => "FX_APPROVED",
            other => other,
        };
        serde_json::from_value(serde_json::Value::String(canonical.to_string()))
            .map_err(|_| UnknownStatus(s.to_string()))
    }
}

/// Error for an unrecognized status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown export status: {0}")]
pub struct UnknownStatus(pub String);
