//! Transition Table
//!
//! The entire edge set and its authorization rule live here and nowhere
//! else: one row per `(from, action)` pair, including one explicit row per
//! rejected state for resubmission and one per pre-shipment state for
//! cancellation.

use crate::core_types::OrgKind;

use super::action::Action;
use super::status::ExportStatus;

/// One edge of the export state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: ExportStatus,
    pub action: Action,
    pub to: ExportStatus,
    /// Organization kind authorized to drive this edge
    pub actor: OrgKind,
}

use Action as A;
use ExportStatus as S;
use OrgKind as O;

const fn edge(from: S, action: A, to: S, actor: O) -> Edge {
    Edge {
        from,
        action,
        to,
        actor,
    }
}

/// The complete edge set
pub const TRANSITIONS: &[Edge] = &[
    // Stage flow
    edge(S::Draft, A::SubmitToExchange, S::ExchangePending, O::ExporterBank),
    edge(S::ExchangePending, A::VerifyLot, S::ExchangeVerified, O::CommodityExchange),
    edge(S::ExchangePending, A::RejectLot, S::ExchangeRejected, O::CommodityExchange),
    edge(S::ExchangeVerified, A::SubmitLicense, S::LicensePending, O::ExporterBank),
    edge(S::LicensePending, A::ApproveLicense, S::LicenseApproved, O::CoffeeAuthority),
    edge(S::LicensePending, A::RejectLicense, S::LicenseRejected, O::CoffeeAuthority),
    edge(S::LicenseApproved, A::SubmitQuality, S::QualityPending, O::ExporterBank),
    edge(S::QualityPending, A::ApproveQuality, S::QualityApproved, O::CoffeeAuthority),
    edge(S::QualityPending, A::RejectQuality, S::QualityRejected, O::CoffeeAuthority),
    edge(S::QualityApproved, A::SubmitContract, S::ContractPending, O::ExporterBank),
    edge(S::ContractPending, A::ApproveContract, S::ContractApproved, O::CoffeeAuthority),
    edge(S::ContractPending, A::RejectContract, S::ContractRejected, O::CoffeeAuthority),
    edge(S::ContractApproved, A::SubmitDocuments, S::BankDocPending, O::ExporterBank),
    edge(S::BankDocPending, A::VerifyDocuments, S::BankDocVerified, O::CommercialBank),
    edge(S::BankDocPending, A::RejectDocuments, S::BankDocRejected, O::CommercialBank),
    edge(S::BankDocVerified, A::SubmitFx, S::FxPending, O::CommercialBank),
    edge(S::FxPending, A::ApproveFx, S::FxApproved, O::NationalBank),
    edge(S::FxPending, A::RejectFx, S::FxRejected, O::NationalBank),
    edge(S::FxApproved, A::SubmitCustoms, S::CustomsPending, O::ExporterBank),
    edge(S::CustomsPending, A::ClearCustoms, S::CustomsCleared, O::Customs),
    edge(S::CustomsPending, A::RejectCustoms, S::CustomsRejected, O::Customs),
    edge(S::CustomsCleared, A::ScheduleShipment, S::ShipmentScheduled, O::ShippingLine),
    edge(S::ShipmentScheduled, A::MarkShipped, S::Shipped, O::ShippingLine),
    edge(S::Shipped, A::MarkArrived, S::Arrived, O::ShippingLine),
    edge(S::Arrived, A::ConfirmDelivery, S::Delivered, O::ShippingLine),
    edge(S::Delivered, A::ConfirmPayment, S::PaymentReceived, O::CommercialBank),
    edge(S::PaymentReceived, A::ConfirmRepatriation, S::Completed, O::NationalBank),
    // Resubmission after rejection, back to DRAFT
    edge(S::ExchangeRejected, A::UpdateAndResubmit, S::Draft, O::ExporterBank),
    edge(S::LicenseRejected, A::UpdateAndResubmit, S::Draft, O::ExporterBank),
    edge(S::QualityRejected, A::UpdateAndResubmit, S::Draft, O::ExporterBank),
    edge(S::ContractRejected, A::UpdateAndResubmit, S::Draft, O::ExporterBank),
    edge(S::BankDocRejected, A::UpdateAndResubmit, S::Draft, O::ExporterBank),
    edge(S::FxRejected, A::UpdateAndResubmit, S::Draft, O::ExporterBank),
    edge(S::CustomsRejected, A::UpdateAndResubmit, S::Draft, O::ExporterBank),
    // Cancellation from any pre-shipment state
    edge(S::Draft, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::ExchangePending, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::ExchangeVerified, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::ExchangeRejected, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::LicensePending, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::LicenseApproved, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::LicenseRejected, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::QualityPending, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::QualityApproved, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::QualityRejected, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::ContractPending, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::ContractApproved, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::ContractRejected, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::BankDocPending, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::BankDocVerified, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::BankDocRejected, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::FxPending, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::FxApproved, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::FxRejected, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::CustomsPending, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::CustomsCleared, A::Cancel, S::Cancelled, O::ExporterBank),
    edge(S::CustomsRejected, A::Cancel, S::Cancelled, O::ExporterBank),
];

/// Find the edge for a `(from, action)` pair
pub fn lookup(from: ExportStatus, action: Action) -> Option<&'static Edge> {
    TRANSITIONS
        .iter()
        .find(|e| e.from == from && e.action == action)
}

/// Actions with an outgoing edge from the given status
pub fn allowed_actions(from: ExportStatus) -> Vec<Action> {
    TRANSITIONS
        .iter()
        .filter(|e| e.from == from)
        .map(|e| e.action)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_no_duplicate_edges() {
        let mut seen = HashSet::new();
        for e in TRANSITIONS {
            assert!(
                seen.insert((e.from, e.action)),
                "duplicate edge {:?} {:?}",
                e.from,
                e.action
            );
        }
    }

    #[test]
    fn test_no_edges_out_of_terminal_states() {
        for e in TRANSITIONS {
            assert!(!e.from.is_terminal(), "edge out of terminal {:?}", e.from);
        }
    }

    #[test]
    fn test_every_rejected_state_can_resubmit() {
        let rejected = [
            ExportStatus::ExchangeRejected,
            ExportStatus::LicenseRejected,
            ExportStatus::QualityRejected,
            ExportStatus::ContractRejected,
            ExportStatus::BankDocRejected,
            ExportStatus::FxRejected,
            ExportStatus::CustomsRejected,
        ];
        for status in rejected {
            let edge = lookup(status, Action::UpdateAndResubmit)
                .unwrap_or_else(|| panic!("no resubmit edge from {status}"));
            assert_eq!(edge.to, ExportStatus::Draft);
            assert_eq!(edge.actor, OrgKind::ExporterBank);
        }
    }

    #[test]
    fn test_cancel_exactly_from_pre_shipment_states() {
        for e in TRANSITIONS.iter().filter(|e| e.action == Action::Cancel) {
            assert!(e.from.is_pre_shipment(), "cancel from {:?}", e.from);
            assert_eq!(e.to, ExportStatus::Cancelled);
            assert_eq!(e.actor, OrgKind::ExporterBank);
        }
        // No pre-shipment state is missing a cancel edge
        let cancellable: HashSet<_> = TRANSITIONS
            .iter()
            .filter(|e| e.action == Action::Cancel)
            .map(|e| e.from)
            .collect();
        for e in TRANSITIONS {
            if e.from.is_pre_shipment() {
                assert!(cancellable.contains(&e.from), "{:?} cannot cancel", e.from);
            }
        }
    }

    #[test]
    fn test_lookup_happy_and_missing() {
        let edge = lookup(ExportStatus::Draft, Action::SubmitToExchange).unwrap();
        assert_eq!(edge.to, ExportStatus::ExchangePending);
        assert_eq!(edge.actor, OrgKind::ExporterBank);

        assert!(lookup(ExportStatus::Draft, Action::ApproveFx).is_none());
        assert!(lookup(ExportStatus::Completed, Action::Cancel).is_none());
    }

    #[test]
    fn test_allowed_actions() {
        let mut actions = allowed_actions(ExportStatus::FxPending);
        actions.sort_by_key(|a| a.as_str());
        assert_eq!(
            actions,
            vec![Action::ApproveFx, Action::Cancel, Action::RejectFx]
        );
        assert!(allowed_actions(ExportStatus::Completed).is_empty());
    }
}
