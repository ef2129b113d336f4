//! cofex - Coffee Export Lifecycle Orchestration Core
//!
//! Coordinates a physical coffee export through its lifecycle states, each
//! owned by one of seven independent organizations. The shared ledger is
//! the single source of truth; this crate supplies the state machine, the
//! resilient access layer in front of the ledger, and the cache/audit/
//! notification side effects that stay consistent with every transition.
//!
//! # Modules
//!
//! - [`core_types`] - Export/organization ids, identity context
//! - [`models`] - ExportRecord, documents, stage patches
//! - [`lifecycle`] - Status enum, transition table, the engine
//! - [`ledger`] - LedgerClient seam, typed contract wrapper, in-memory
//!   reference implementation
//! - [`gateway`] - Retry/timeout/circuit-breaker wrapper, the only path to
//!   the ledger
//! - [`cache`] - TTL read cache, invalidated on writes
//! - [`audit`] - Append-only trail of every attempted transition
//! - [`notify`] - At-most-once event fanout to subscriber rooms
//! - [`blob`] - Content-addressed document store interface
//! - [`error`] - The stable error taxonomy
//! - [`config`] / [`logging`] - Service wiring

// Core types - must be first!
pub mod core_types;

pub mod audit;
pub mod blob;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod notify;

// Convenient re-exports at crate root
pub use cache::{RecordCache, Ttl};
pub use core_types::{ExportId, IdentityContext, OrgId, OrgKind, Role};
pub use error::ExportError;
pub use gateway::{GatewayPolicy, ResilientLedgerGateway};
pub use ledger::{ExportLedger, InMemoryLedger, LedgerClient, LedgerError};
pub use lifecycle::{Action, ActionPayload, ExportStatus, StatusTransitionEngine};
pub use models::{DocumentCategory, ExportRecord, NewExport, PaymentMethod};
pub use notify::{NotificationService, SubscriberRegistry, TransitionEvent};
