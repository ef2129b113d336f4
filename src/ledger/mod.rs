//! Ledger Access
//!
//! The narrow [`LedgerClient`] seam, the typed [`ExportLedger`] wrapper the
//! engine calls, and the in-memory reference implementation. All calls flow
//! through the resilient gateway; nothing in the crate talks to a ledger
//! client directly.

pub mod client;
pub mod contract;
pub mod memory;

pub use client::{LedgerClient, LedgerError};
pub use contract::ExportLedger;
pub use memory::InMemoryLedger;

/// Contract function names, shared between the typed wrapper and the
/// reference implementation
pub mod functions {
    pub const CREATE_EXPORT: &str = "CreateExport";
    pub const READ_EXPORT: &str = "ReadExport";
    pub const TRANSITION_EXPORT: &str = "TransitionExport";
    pub const LIST_BY_STATUS: &str = "ListByStatus";
    pub const LIST_BY_ORG: &str = "ListByOrg";
    pub const ATTACH_DOCUMENT: &str = "AttachDocument";
    pub const DEACTIVATE_DOCUMENT: &str = "DeactivateDocument";
}
