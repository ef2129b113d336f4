//! Lifecycle Actions and Payloads
//!
//! One well-typed payload variant per action. Payloads are validated before
//! the engine performs any side effect; the rejected/approved reason strings
//! flow into the audit trail, the stage fields flow into the ledger patch.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::models::{PaymentMethod, StagePatch};

/// Actions an organization can request on an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    SubmitToExchange,
    VerifyLot,
    RejectLot,
    SubmitLicense,
    ApproveLicense,
    RejectLicense,
    SubmitQuality,
    ApproveQuality,
    RejectQuality,
    SubmitContract,
    ApproveContract,
    RejectContract,
    SubmitDocuments,
    VerifyDocuments,
    RejectDocuments,
    #[serde(rename = "submitFX")]
    SubmitFx,
    #[serde(rename = "approveFX")]
    ApproveFx,
    #[serde(rename = "rejectFX")]
    RejectFx,
    SubmitCustoms,
    ClearCustoms,
    RejectCustoms,
    ScheduleShipment,
    MarkShipped,
    MarkArrived,
    ConfirmDelivery,
    ConfirmPayment,
    ConfirmRepatriation,
    UpdateAndResubmit,
    Cancel,
}

impl Action {
    /// Wire/audit spelling of this action
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::SubmitToExchange => "submitToExchange",
            Action::VerifyLot => "verifyLot",
            Action::RejectLot => "rejectLot",
            Action::SubmitLicense => "submitLicense",
            Action::ApproveLicense => "approveLicense",
            Action::RejectLicense => "rejectLicense",
            Action::SubmitQuality => "submitQuality",
            Action::ApproveQuality => "approveQuality",
            Action::RejectQuality => "rejectQuality",
            Action::SubmitContract => "submitContract",
            Action::ApproveContract => "approveContract",
            Action::RejectContract => "rejectContract",
            Action::SubmitDocuments => "submitDocuments",
            Action::VerifyDocuments => "verifyDocuments",
            Action::RejectDocuments => "rejectDocuments",
            Action::SubmitFx => "submitFX",
            Action::ApproveFx => "approveFX",
            Action::RejectFx => "rejectFX",
            Action::SubmitCustoms => "submitCustoms",
            Action::ClearCustoms => "clearCustoms",
            Action::RejectCustoms => "rejectCustoms",
            Action::ScheduleShipment => "scheduleShipment",
            Action::MarkShipped => "markShipped",
            Action::MarkArrived => "markArrived",
            Action::ConfirmDelivery => "confirmDelivery",
            Action::ConfirmPayment => "confirmPayment",
            Action::ConfirmRepatriation => "confirmRepatriation",
            Action::UpdateAndResubmit => "updateAndResubmit",
            Action::Cancel => "cancel",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tagged payload union, one variant per action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "camelCase")]
pub enum ActionPayload {
    SubmitToExchange {
        lot_number: String,
    },
    VerifyLot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    RejectLot {
        reason: String,
    },
    SubmitLicense,
    ApproveLicense {
        license_number: String,
    },
    RejectLicense {
        reason: String,
    },
    SubmitQuality,
    ApproveQuality {
        quality_grade: String,
        certificate_no: String,
    },
    RejectQuality {
        reason: String,
    },
    SubmitContract {
        contract_number: String,
    },
    ApproveContract {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    RejectContract {
        reason: String,
    },
    SubmitDocuments,
    VerifyDocuments {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    RejectDocuments {
        reason: String,
    },
    #[serde(rename = "submitFX")]
    SubmitFx {
        payment_method: PaymentMethod,
        fx_amount: Decimal,
    },
    #[serde(rename = "approveFX")]
    ApproveFx {
        fx_approval_id: String,
    },
    #[serde(rename = "rejectFX")]
    RejectFx {
        reason: String,
    },
    SubmitCustoms {
        declaration_no: String,
    },
    ClearCustoms {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    RejectCustoms {
        reason: String,
    },
    ScheduleShipment {
        vessel: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voyage: Option<String>,
    },
    MarkShipped {
        bill_of_lading: String,
    },
    MarkArrived,
    ConfirmDelivery,
    ConfirmPayment {
        payment_amount: Decimal,
    },
    ConfirmRepatriation,
    UpdateAndResubmit {
        updates: StagePatch,
    },
    Cancel {
        reason: String,
    },
}

fn require(field: &str, value: &str) -> Result<(), ExportError> {
    if value.trim().is_empty() {
        return Err(ExportError::ValidationFailed(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn require_positive(field: &str, value: Decimal) -> Result<(), ExportError> {
    if value <= Decimal::ZERO {
        return Err(ExportError::ValidationFailed(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

impl ActionPayload {
    /// The action this payload carries
    pub fn action(&self) -> Action {
        match self {
            ActionPayload::SubmitToExchange { .. } => Action::SubmitToExchange,
            ActionPayload::VerifyLot { .. } => Action::VerifyLot,
            ActionPayload::RejectLot { .. } => Action::RejectLot,
            ActionPayload::SubmitLicense => Action::SubmitLicense,
            ActionPayload::ApproveLicense { .. } => Action::ApproveLicense,
            ActionPayload::RejectLicense { .. } => Action::RejectLicense,
            ActionPayload::SubmitQuality => Action::SubmitQuality,
            ActionPayload::ApproveQuality { .. } => Action::ApproveQuality,
            ActionPayload::RejectQuality { .. } => Action::RejectQuality,
            ActionPayload::SubmitContract { .. } => Action::SubmitContract,
            ActionPayload::ApproveContract { .. } => Action::ApproveContract,
            ActionPayload::RejectContract { .. } => Action::RejectContract,
            ActionPayload::SubmitDocuments => Action::SubmitDocuments,
            ActionPayload::VerifyDocuments { .. } => Action::VerifyDocuments,
            ActionPayload::RejectDocuments { .. } => Action::RejectDocuments,
            ActionPayload::SubmitFx { .. } => Action::SubmitFx,
            ActionPayload::ApproveFx { .. } => Action::ApproveFx,
            ActionPayload::RejectFx { .. } => Action::RejectFx,
            ActionPayload::SubmitCustoms { .. } => Action::SubmitCustoms,
            ActionPayload::ClearCustoms { .. } => Action::ClearCustoms,
            ActionPayload::RejectCustoms { .. } => Action::RejectCustoms,
            ActionPayload::ScheduleShipment { .. } => Action::ScheduleShipment,
            ActionPayload::MarkShipped { .. } => Action::MarkShipped,
            ActionPayload::MarkArrived => Action::MarkArrived,
            ActionPayload::ConfirmDelivery => Action::ConfirmDelivery,
            ActionPayload::ConfirmPayment { .. } => Action::ConfirmPayment,
            ActionPayload::ConfirmRepatriation => Action::ConfirmRepatriation,
            ActionPayload::UpdateAndResubmit { .. } => Action::UpdateAndResubmit,
            ActionPayload::Cancel { .. } => Action::Cancel,
        }
    }

    /// Validate field contents before any side effect
    pub fn validate(&self) -> Result<(), ExportError> {
        match self {
            ActionPayload::SubmitToExchange { lot_number } => require("lot_number", lot_number),
            ActionPayload::RejectLot { reason }
            | ActionPayload::RejectLicense { reason }
            | ActionPayload::RejectQuality { reason }
            | ActionPayload::RejectContract { reason }
            | ActionPayload::RejectDocuments { reason }
            | ActionPayload::RejectFx { reason }
            | ActionPayload::RejectCustoms { reason }
            | ActionPayload::Cancel { reason } => require("reason", reason),
            ActionPayload::ApproveLicense { license_number } => {
                require("license_number", license_number)
            }
            ActionPayload::ApproveQuality {
                quality_grade,
                certificate_no,
            } => {
                require("quality_grade", quality_grade)?;
                require("certificate_no", certificate_no)
            }
            ActionPayload::SubmitContract { contract_number } => {
                require("contract_number", contract_number)
            }
            ActionPayload::SubmitFx { fx_amount, .. } => require_positive("fx_amount", *fx_amount),
            ActionPayload::ApproveFx { fx_approval_id } => {
                require("fx_approval_id", fx_approval_id)
            }
            ActionPayload::SubmitCustoms { declaration_no } => {
                require("declaration_no", declaration_no)
            }
            ActionPayload::ScheduleShipment { vessel, .. } => require("vessel", vessel),
            ActionPayload::MarkShipped { bill_of_lading } => {
                require("bill_of_lading", bill_of_lading)
            }
            ActionPayload::ConfirmPayment { payment_amount } => {
                require_positive("payment_amount", *payment_amount)
            }
            ActionPayload::UpdateAndResubmit { updates } => {
                if let Some(qty) = updates.quantity_kg {
                    if qty == 0 {
                        return Err(ExportError::ValidationFailed(
                            "quantity_kg must be greater than zero".to_string(),
                        ));
                    }
                }
                if let Some(value) = updates.estimated_value {
                    require_positive("estimated_value", value)?;
                }
                Ok(())
            }
            ActionPayload::VerifyLot { .. }
            | ActionPayload::SubmitLicense
            | ActionPayload::SubmitQuality
            | ActionPayload::ApproveContract { .. }
            | ActionPayload::SubmitDocuments
            | ActionPayload::VerifyDocuments { .. }
            | ActionPayload::ClearCustoms { .. }
            | ActionPayload::MarkArrived
            | ActionPayload::ConfirmDelivery
            | ActionPayload::ConfirmRepatriation => Ok(()),
        }
    }

    /// Stage fields this payload writes to the record
    pub fn stage_patch(&self) -> StagePatch {
        match self {
            ActionPayload::SubmitToExchange { lot_number } => StagePatch {
                lot_number: Some(lot_number.clone()),
                ..Default::default()
            },
            ActionPayload::ApproveLicense { license_number } => StagePatch {
                license_number: Some(license_number.clone()),
                ..Default::default()
            },
            ActionPayload::ApproveQuality {
                quality_grade,
                certificate_no,
            } => StagePatch {
                quality_grade: Some(quality_grade.clone()),
                quality_certificate_no: Some(certificate_no.clone()),
                ..Default::default()
            },
            ActionPayload::SubmitContract { contract_number } => StagePatch {
                contract_number: Some(contract_number.clone()),
                ..Default::default()
            },
            ActionPayload::SubmitFx {
                payment_method,
                fx_amount,
            } => StagePatch {
                payment_method: Some(*payment_method),
                fx_amount: Some(*fx_amount),
                ..Default::default()
            },
            ActionPayload::ApproveFx { fx_approval_id } => StagePatch {
                fx_approval_id: Some(fx_approval_id.clone()),
                ..Default::default()
            },
            ActionPayload::SubmitCustoms { declaration_no } => StagePatch {
                customs_declaration_no: Some(declaration_no.clone()),
                ..Default::default()
            },
            ActionPayload::ScheduleShipment { vessel, voyage } => StagePatch {
                vessel: Some(vessel.clone()),
                voyage: voyage.clone(),
                ..Default::default()
            },
            ActionPayload::MarkShipped { bill_of_lading } => StagePatch {
                bill_of_lading: Some(bill_of_lading.clone()),
                ..Default::default()
            },
            ActionPayload::ConfirmPayment { payment_amount } => StagePatch {
                payment_amount: Some(*payment_amount),
                ..Default::default()
            },
            ActionPayload::UpdateAndResubmit { updates } => updates.clone(),
            _ => StagePatch::default(),
        }
    }

    /// Business reason carried by the payload, for the audit trail
    pub fn reason(&self) -> Option<&str> {
        match self {
            ActionPayload::RejectLot { reason }
            | ActionPayload::RejectLicense { reason }
            | ActionPayload::RejectQuality { reason }
            | ActionPayload::RejectContract { reason }
            | ActionPayload::RejectDocuments { reason }
            | ActionPayload::RejectFx { reason }
            | ActionPayload::RejectCustoms { reason }
            | ActionPayload::Cancel { reason } => Some(reason),
            ActionPayload::VerifyLot { note }
            | ActionPayload::ApproveContract { note }
            | ActionPayload::VerifyDocuments { note }
            | ActionPayload::ClearCustoms { note } => note.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: &[Action] = &[
        Action::SubmitToExchange,
        Action::VerifyLot,
        Action::RejectLot,
        Action::SubmitLicense,
        Action::ApproveLicense,
        Action::RejectLicense,
        Action::SubmitQuality,
        Action::ApproveQuality,
        Action::RejectQuality,
        Action::SubmitContract,
        Action::ApproveContract,
        Action::RejectContract,
        Action::SubmitDocuments,
        Action::VerifyDocuments,
        Action::RejectDocuments,
        Action::SubmitFx,
        Action::ApproveFx,
        Action::RejectFx,
        Action::SubmitCustoms,
        Action::ClearCustoms,
        Action::RejectCustoms,
        Action::ScheduleShipment,
        Action::MarkShipped,
        Action::MarkArrived,
        Action::ConfirmDelivery,
        Action::ConfirmPayment,
        Action::ConfirmRepatriation,
        Action::UpdateAndResubmit,
        Action::Cancel,
    ];

    #[test]
    fn test_serde_spelling_matches_as_str() {
        // The contract parses the serde spelling; it must agree with the
        // wire spelling everywhere, FX casing included.
        for action in ALL_ACTIONS {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, serde_json::Value::String(action.as_str().to_string()));
            let back: Action = serde_json::from_value(json).unwrap();
            assert_eq!(back, *action);
        }
    }

    #[test]
    fn test_payload_action_mapping() {
        let payload = ActionPayload::SubmitToExchange {
            lot_number: "ECX-1".to_string(),
        };
        assert_eq!(payload.action(), Action::SubmitToExchange);
        assert_eq!(ActionPayload::SubmitLicense.action(), Action::SubmitLicense);
    }

    #[test]
    fn test_validation_rejects_empty_reason() {
        let payload = ActionPayload::RejectQuality {
            reason: "  ".to_string(),
        };
        assert!(matches!(
            payload.validate(),
            Err(ExportError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_validation_rejects_non_positive_amount() {
        let payload = ActionPayload::SubmitFx {
            payment_method: PaymentMethod::LetterOfCredit,
            fx_amount: Decimal::ZERO,
        };
        assert!(matches!(
            payload.validate(),
            Err(ExportError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_stage_patch_contents() {
        let payload = ActionPayload::ApproveQuality {
            quality_grade: "Grade 1".to_string(),
            certificate_no: "QC-778".to_string(),
        };
        let patch = payload.stage_patch();
        assert_eq!(patch.quality_grade.as_deref(), Some("Grade 1"));
        assert_eq!(patch.quality_certificate_no.as_deref(), Some("QC-778"));
        assert!(patch.lot_number.is_none());
    }

    #[test]
    fn test_wire_format_tagged_by_action() {
        let payload = ActionPayload::Cancel {
            reason: "buyer defaulted".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["action"], "cancel");
        assert_eq!(json["params"]["reason"], "buyer defaulted");

        let unit = serde_json::to_value(&ActionPayload::MarkArrived).unwrap();
        assert_eq!(unit["action"], "markArrived");
    }

    #[test]
    fn test_reason_extraction() {
        let payload = ActionPayload::RejectFx {
            reason: "insufficient FX reserves".to_string(),
        };
        assert_eq!(payload.reason(), Some("insufficient FX reserves"));
        assert_eq!(ActionPayload::SubmitQuality.reason(), None);
    }
}
