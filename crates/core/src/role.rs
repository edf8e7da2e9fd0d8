//! Union roles and the separation-of-duties groupings built on them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role held by a caller, as reported by the identity directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Ordinary union member (recipient of disbursements)
    Member,
    /// Chairperson - financial authority
    Chairperson,
    /// Secretary - administrative, read-only on payments
    Secretary,
    /// Treasurer - financial authority
    Treasurer,
    /// Signatory - approves or rejects disbursements
    Signatory,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Chairperson => "chairperson",
            Role::Secretary => "secretary",
            Role::Treasurer => "treasurer",
            Role::Signatory => "signatory",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Role::Member),
            "chairperson" => Some(Role::Chairperson),
            "secretary" => Some(Role::Secretary),
            "treasurer" => Some(Role::Treasurer),
            "signatory" => Some(Role::Signatory),
            _ => None,
        }
    }

    /// Roles permitted to initiate a disbursement request
    pub fn is_financial_authority(&self) -> bool {
        matches!(self, Role::Chairperson | Role::Treasurer)
    }

    /// The only role permitted to approve or reject a disbursement.
    ///
    /// Disjoint from the financial-authority roles.
    pub fn is_signatory(&self) -> bool {
        matches!(self, Role::Signatory)
    }

    /// Any union officer (everyone but plain members)
    pub fn is_admin(&self) -> bool {
        !matches!(self, Role::Member)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
