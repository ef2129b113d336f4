//! Core identity types used throughout the system
//!
//! Export ids, organization identifiers and the per-request identity
//! context supplied by the authentication layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Export ID - ULID-based unique identifier
///
/// Using ULID provides:
/// - Monotonic, sortable IDs
/// - No coordination needed between organization services
/// - 128-bit with good entropy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportId(ulid::Ulid);

impl ExportId {
    /// Generate a new unique ExportId
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get the inner ULID value
    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for ExportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExportId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Organization ID - opaque identifier assigned by the consortium registrar
///
/// Singleton participants (exchange, authority, national bank, customs) use
/// their well-known registrar id; banks each carry their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(String);

impl OrgId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The seven independent organizations participating in an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgKind {
    /// The exporter's bank - creates and owns the export record
    ExporterBank,
    /// Commodity exchange - verifies the coffee lot
    CommodityExchange,
    /// Coffee and tea authority - licenses, quality and contract approval
    CoffeeAuthority,
    /// National bank - FX approval and repatriation confirmation
    NationalBank,
    /// Customs authority - declaration clearance
    Customs,
    /// Commercial bank - document verification and payment confirmation
    CommercialBank,
    /// Shipping line - scheduling through delivery
    ShippingLine,
}

impl OrgKind {
    /// Get the canonical topic/room name for this organization kind
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgKind::ExporterBank => "EXPORTER_BANK",
            OrgKind::CommodityExchange => "COMMODITY_EXCHANGE",
            OrgKind::CoffeeAuthority => "COFFEE_AUTHORITY",
            OrgKind::NationalBank => "NATIONAL_BANK",
            OrgKind::Customs => "CUSTOMS",
            OrgKind::CommercialBank => "COMMERCIAL_BANK",
            OrgKind::ShippingLine => "SHIPPING_LINE",
        }
    }
}

impl fmt::Display for OrgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role of an actor within its organization
///
/// Roles are issued by the out-of-scope authentication layer. ReadOnly
/// identities may query but never apply transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Operator,
    ReadOnly,
}

impl Role {
    /// Whether this role may invoke state-changing operations
    #[inline]
    pub fn can_write(&self) -> bool {
        !matches!(self, Role::ReadOnly)
    }
}

/// Per-request identity supplied by the authentication layer
///
/// Trusted as-is by the engine. Provenance fields are optional and flow
/// into the audit trail only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityContext {
    pub actor_id: String,
    pub org_id: OrgId,
    pub org_kind: OrgKind,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl IdentityContext {
    pub fn new(
        actor_id: impl Into<String>,
        org_id: impl Into<OrgId>,
        org_kind: OrgKind,
        role: Role,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            org_id: org_id.into(),
            org_kind,
            role,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_provenance(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

impl From<String> for OrgId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
