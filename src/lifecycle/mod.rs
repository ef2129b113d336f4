//! Export Lifecycle
//!
//! The status state machine and the engine that drives it.
//!
//! # State Machine
//!
//! ```text
//! DRAFT -> EXCHANGE_* -> LICENSE_* -> QUALITY_* -> CONTRACT_* ->
//! BANK_DOC_* -> FX_* -> CUSTOMS_* -> SHIPMENT_SCHEDULED -> SHIPPED ->
//! ARRIVED -> DELIVERED -> PAYMENT_RECEIVED -> COMPLETED
//! ```
//!
//! Every review stage branches into approved/rejected; any rejected state
//! resubmits back to DRAFT, any pre-shipment state can be cancelled by the
//! originating bank. The full edge set lives in [`table::TRANSITIONS`] and
//! nowhere else.
//!
//! # Guarantees
//!
//! 1. Transitions only along table edges, by the authorized organization
//! 2. A ledger failure leaves status unchanged and is audited as a failure
//! 3. Side effects are ordered: ledger write, cache invalidation, audit
//!    append, notification - an audit success entry therefore never exists
//!    without a committed ledger write
//! 4. Concurrent writers are serialized by the ledger's optimistic
//!    concurrency check; the loser sees `LedgerConflict`

pub mod action;
pub mod engine;
pub mod status;
pub mod table;

pub use action::{Action, ActionPayload};
pub use engine::StatusTransitionEngine;
pub use status::ExportStatus;
pub use table::{Edge, TRANSITIONS, allowed_actions, lookup};
