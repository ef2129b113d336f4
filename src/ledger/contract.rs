//! Typed Export Contract Wrapper
//!
//! Encodes engine intents into contract calls and decodes the returned
//! record bytes. Owns no policy: retries, timeouts and the breaker live in
//! the gateway underneath.

use std::sync::Arc;

use tokio::time::Instant;

use crate::core_types::{ExportId, OrgId};
use crate::error::ExportError;
use crate::gateway::ResilientLedgerGateway;
use crate::lifecycle::action::Action;
use crate::lifecycle::status::ExportStatus;
use crate::models::{DocumentCategory, ExportRecord, NewExport, StagePatch};

use super::functions;

pub struct ExportLedger {
    gateway: Arc<ResilientLedgerGateway>,
    contract: String,
}

impl ExportLedger {
    pub fn new(gateway: Arc<ResilientLedgerGateway>, contract: impl Into<String>) -> Self {
        Self {
            gateway,
            contract: contract.into(),
        }
    }

    fn decode(bytes: &[u8]) -> Result<ExportRecord, ExportError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ExportError::Internal(format!("undecodable ledger record: {e}")))
    }

    fn decode_list(bytes: &[u8]) -> Result<Vec<ExportRecord>, ExportError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ExportError::Internal(format!("undecodable ledger record list: {e}")))
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<String, ExportError> {
        serde_json::to_string(value).map_err(|e| ExportError::Internal(e.to_string()))
    }

    pub async fn create(
        &self,
        spec: &NewExport,
        originating_org: &OrgId,
        deadline: Option<Instant>,
    ) -> Result<ExportRecord, ExportError> {
        let args = vec![Self::encode(spec)?, originating_org.to_string()];
        let bytes = self
            .gateway
            .submit(&self.contract, functions::CREATE_EXPORT, &args, deadline)
            .await?;
        Self::decode(&bytes)
    }

    pub async fn read(
        &self,
        export_id: &ExportId,
        deadline: Option<Instant>,
    ) -> Result<ExportRecord, ExportError> {
        let args = vec![export_id.to_string()];
        let bytes = self
            .gateway
            .query(&self.contract, functions::READ_EXPORT, &args, deadline)
            .await?;
        Self::decode(&bytes)
    }

    /// Submit a transition computed against `from`; the contract re-checks
    /// both the edge and the current status (optimistic concurrency)
    pub async fn transition(
        &self,
        export_id: &ExportId,
        action: Action,
        from: ExportStatus,
        to: ExportStatus,
        patch: &StagePatch,
        deadline: Option<Instant>,
    ) -> Result<ExportRecord, ExportError> {
        let args = vec![
            export_id.to_string(),
            action.as_str().to_string(),
            from.as_str().to_string(),
            to.as_str().to_string(),
            Self::encode(patch)?,
        ];
        let bytes = self
            .gateway
            .submit(&self.contract, functions::TRANSITION_EXPORT, &args, deadline)
            .await?;
        Self::decode(&bytes)
    }

    pub async fn list_by_status(
        &self,
        status: ExportStatus,
        deadline: Option<Instant>,
    ) -> Result<Vec<ExportRecord>, ExportError> {
        let args = vec![status.as_str().to_string()];
        let bytes = self
            .gateway
            .query(&self.contract, functions::LIST_BY_STATUS, &args, deadline)
            .await?;
        Self::decode_list(&bytes)
    }

    pub async fn list_by_org(
        &self,
        org: &OrgId,
        deadline: Option<Instant>,
    ) -> Result<Vec<ExportRecord>, ExportError> {
        let args = vec![org.to_string()];
        let bytes = self
            .gateway
            .query(&self.contract, functions::LIST_BY_ORG, &args, deadline)
            .await?;
        Self::decode_list(&bytes)
    }

    pub async fn attach_document(
        &self,
        export_id: &ExportId,
        category: DocumentCategory,
        content_hash: &str,
        deadline: Option<Instant>,
    ) -> Result<ExportRecord, ExportError> {
        let args = vec![
            export_id.to_string(),
            category.as_str().to_string(),
            content_hash.to_string(),
        ];
        let bytes = self
            .gateway
            .submit(&self.contract, functions::ATTACH_DOCUMENT, &args, deadline)
            .await?;
        Self::decode(&bytes)
    }

    pub async fn deactivate_document(
        &self,
        export_id: &ExportId,
        category: DocumentCategory,
        version: u32,
        deadline: Option<Instant>,
    ) -> Result<ExportRecord, ExportError> {
        let args = vec![
            export_id.to_string(),
            category.as_str().to_string(),
            version.to_string(),
        ];
        let bytes = self
            .gateway
            .submit(
                &self.contract,
                functions::DEACTIVATE_DOCUMENT,
                &args,
                deadline,
            )
            .await?;
        Self::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayPolicyConfig;
    use crate::gateway::GatewayPolicy;
    use crate::ledger::InMemoryLedger;
    use rust_decimal::Decimal;

    fn export_ledger() -> ExportLedger {
        let gateway = Arc::new(ResilientLedgerGateway::new(
            Arc::new(InMemoryLedger::new()),
            GatewayPolicy::from(&GatewayPolicyConfig::default()),
        ));
        ExportLedger::new(gateway, "exportlifecycle")
    }

    fn spec() -> NewExport {
        NewExport {
            coffee_type: "Limu".to_string(),
            quantity_kg: 5_000,
            destination_country: "SA".to_string(),
            estimated_value: Decimal::new(31_000_00, 2),
        }
    }

    #[tokio::test]
    async fn test_create_read_roundtrip() {
        let ledger = export_ledger();
        let org = OrgId::from("dashen-bank");

        let created = ledger.create(&spec(), &org, None).await.unwrap();
        assert_eq!(created.status, ExportStatus::Draft);
        assert_eq!(created.originating_org, org);

        let read = ledger.read(&created.export_id, None).await.unwrap();
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_read_missing_maps_to_not_found() {
        let ledger = export_ledger();
        let err = ledger.read(&ExportId::new(), None).await.unwrap_err();
        assert!(matches!(err, ExportError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_transition_and_stale_conflict() {
        let ledger = export_ledger();
        let org = OrgId::from("dashen-bank");
        let created = ledger.create(&spec(), &org, None).await.unwrap();

        let patch = StagePatch {
            lot_number: Some("ECX-42".to_string()),
            ..Default::default()
        };
        let updated = ledger
            .transition(
                &created.export_id,
                Action::SubmitToExchange,
                ExportStatus::Draft,
                ExportStatus::ExchangePending,
                &patch,
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ExportStatus::ExchangePending);
        assert_eq!(updated.lot_number.as_deref(), Some("ECX-42"));

        // Replaying the same transition is now stale
        let err = ledger
            .transition(
                &created.export_id,
                Action::SubmitToExchange,
                ExportStatus::Draft,
                ExportStatus::ExchangePending,
                &patch,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::LedgerConflict));
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let ledger = export_ledger();
        let org = OrgId::from("dashen-bank");
        ledger.create(&spec(), &org, None).await.unwrap();
        ledger.create(&spec(), &org, None).await.unwrap();

        let drafts = ledger.list_by_status(ExportStatus::Draft, None).await.unwrap();
        assert_eq!(drafts.len(), 2);
        let shipped = ledger.list_by_status(ExportStatus::Shipped, None).await.unwrap();
        assert!(shipped.is_empty());
    }
}
