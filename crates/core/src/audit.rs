//! Audit log sink
//!
//! Audit storage is external. Writes are fire-and-forget: a sink must
//! never block or fail the operation that produced the entry.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Audited actions in the payment workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    PaymentInitiated,
    PaymentApproved,
    PaymentRejected,
    PaymentProviderInitiated,
    PaymentProviderFailed,
    PaymentSettled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PaymentInitiated => "PAYMENT_INITIATED",
            AuditAction::PaymentApproved => "PAYMENT_APPROVED",
            AuditAction::PaymentRejected => "PAYMENT_REJECTED",
            AuditAction::PaymentProviderInitiated => "PAYMENT_PROVIDER_INITIATED",
            AuditAction::PaymentProviderFailed => "PAYMENT_PROVIDER_FAILED",
            AuditAction::PaymentSettled => "PAYMENT_SETTLED",
        }
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub user_id: String,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub details: Value,
}

impl AuditEntry {
    /// Audit entry for an issued payment
    pub fn payment(
        user_id: impl Into<String>,
        action: AuditAction,
        payment_id: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            action,
            resource_type: "issued_payment".to_string(),
            resource_id: payment_id.into(),
            details,
        }
    }
}

/// Destination for audit entries
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Emits audit entries as structured `tracing` events on the `audit` target
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "audit",
            user_id = %entry.user_id,
            action = entry.action.as_str(),
            resource_type = %entry.resource_type,
            resource_id = %entry.resource_id,
            details = %entry.details,
            "audit"
        );
    }
}

/// Collects audit entries in memory (for testing)
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Actions recorded for one resource, in order
    pub fn actions_for(&self, resource_id: &str) -> Vec<AuditAction> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.resource_id == resource_id)
            .map(|e| e.action)
            .collect()
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, entry: AuditEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
