//! Issued payment record and its two status axes
//!
//! ```text
//! approval axis:   Pending ──► Approved
//!                     │
//!                     └─────► Rejected
//!
//! payment axis (only once Approved):
//!                  Unset ──► Processing ──► Settled
//!                    │            │
//!                    └────────────┴──────► ProviderFailed
//! ```

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use unionpay_core::Amount;

/// Approval axis of an issued payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a signatory decision
    Pending,
    /// Approved by a signatory; settlement may be attempted
    Approved,
    /// Rejected by a signatory
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApprovalStatus::Pending),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }

    /// Both decisions are terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    pub fn can_transition_to(&self, next: ApprovalStatus) -> bool {
        matches!(
            (self, next),
            (ApprovalStatus::Pending, ApprovalStatus::Approved)
                | (ApprovalStatus::Pending, ApprovalStatus::Rejected)
        )
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement axis of an issued payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No settlement attempted
    Unset,
    /// Accepted by the provider, awaiting completion
    Processing,
    /// Provider confirmed the transfer
    Settled,
    /// Submission or settlement failed
    ProviderFailed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unset => "unset",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Settled => "settled",
            PaymentStatus::ProviderFailed => "provider_failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unset" => Some(PaymentStatus::Unset),
            "processing" => Some(PaymentStatus::Processing),
            "settled" => Some(PaymentStatus::Settled),
            "provider_failed" => Some(PaymentStatus::ProviderFailed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Settled | PaymentStatus::ProviderFailed)
    }

    /// States from which `target` may be entered
    pub fn predecessors(target: PaymentStatus) -> &'static [PaymentStatus] {
        match target {
            PaymentStatus::Unset => &[],
            PaymentStatus::Processing => &[PaymentStatus::Unset],
            PaymentStatus::Settled => &[PaymentStatus::Processing],
            PaymentStatus::ProviderFailed => &[PaymentStatus::Unset, PaymentStatus::Processing],
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        Self::predecessors(next).contains(self)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signatory's decision on a pending payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: String },
}

impl Decision {
    pub fn reject(reason: impl Into<String>) -> Self {
        Decision::Reject {
            reason: reason.into(),
        }
    }

    /// Approval status this decision leads to
    pub fn target_status(&self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject { .. } => ApprovalStatus::Rejected,
        }
    }

    pub fn is_approve(&self) -> bool {
        matches!(self, Decision::Approve)
    }
}

/// Result of a settlement attempt, as recorded on the payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Provider accepted the request
    Processing {
        provider: String,
        provider_reference: String,
    },
    /// Provider confirmed completion
    Settled,
    /// Submission refused, errored, or the provider reported failure
    ProviderFailed {
        provider: Option<String>,
        error: String,
    },
}

impl SettlementOutcome {
    pub fn target_status(&self) -> PaymentStatus {
        match self {
            SettlementOutcome::Processing { .. } => PaymentStatus::Processing,
            SettlementOutcome::Settled => PaymentStatus::Settled,
            SettlementOutcome::ProviderFailed { .. } => PaymentStatus::ProviderFailed,
        }
    }
}

/// Input for a new disbursement request
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub initiated_by: String,
    pub issued_to: String,
    pub amount: rust_decimal::Decimal,
    pub purpose: String,
}

/// One disbursement request and its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedPayment {
    pub id: String,
    pub initiated_by: String,
    pub issued_to: String,
    pub amount: Amount,
    pub purpose: String,
    pub transaction_reference: String,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_provider: Option<String>,
    pub payment_provider_reference: Option<String>,
    pub provider_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssuedPayment {
    /// Create a fresh pending record
    pub fn new(
        initiated_by: impl Into<String>,
        issued_to: impl Into<String>,
        amount: Amount,
        purpose: impl Into<String>,
        transaction_reference: String,
    ) -> Self {
        // Stored timestamps carry microsecond precision
        let now = Utc::now().trunc_subsecs(6);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            initiated_by: initiated_by.into(),
            issued_to: issued_to.into(),
            amount,
            purpose: purpose.into(),
            transaction_reference,
            approval_status: ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            payment_status: PaymentStatus::Unset,
            payment_provider: None,
            payment_provider_reference: None,
            provider_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.approval_status == ApprovalStatus::Pending
    }

    /// Invariants that must hold for every stored record.
    ///
    /// Returns the list of violated invariants (empty when consistent).
    pub fn invariant_violations(&self) -> Vec<&'static str> {
        let mut violations = Vec::new();

        if self.approved_by.as_deref() == Some(self.initiated_by.as_str()) {
            violations.push("decided by its own initiator");
        }
        if self.approval_status.is_terminal() && self.approved_by.is_none() {
            violations.push("decided without a decider");
        }
        if !self.approval_status.is_terminal() && self.approved_by.is_some() {
            violations.push("pending with a decider");
        }
        if self.approval_status != ApprovalStatus::Approved
            && self.payment_status != PaymentStatus::Unset
        {
            violations.push("settlement state on a non-approved payment");
        }
        let has_reason = self
            .rejection_reason
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        if has_reason != (self.approval_status == ApprovalStatus::Rejected) {
            violations.push("rejection reason present iff rejected");
        }

        violations
    }
}

/// Generate a transaction reference: `ISS-<yyyyMMddHHmmss>-<12 hex>`.
///
/// The random suffix comes from a v4 UUID; uniqueness is also enforced by
/// the store, which regenerates on collision.
pub fn generate_transaction_reference(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string()[..12].to_uppercase();
    format!("ISS-{}-{}", now.format("%Y%m%d%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    fn sample_payment() -> IssuedPayment {
        IssuedPayment::new(
            "finance-1",
            "member-1",
            Amount::new(dec!(5000)).unwrap(),
            "Travel reimbursement",
            generate_transaction_reference(Utc::now()),
        )
    }

    #[test]
    fn test_new_payment_is_pending_and_unset() {
        let payment = sample_payment();

        assert_eq!(payment.approval_status, ApprovalStatus::Pending);
        assert_eq!(payment.payment_status, PaymentStatus::Unset);
        assert!(payment.approved_by.is_none());
        assert!(payment.invariant_violations().is_empty());
    }

    #[test]
    fn test_approval_transitions() {
        assert!(ApprovalStatus::Pending.can_transition_to(ApprovalStatus::Approved));
        assert!(ApprovalStatus::Pending.can_transition_to(ApprovalStatus::Rejected));
        assert!(!ApprovalStatus::Approved.can_transition_to(ApprovalStatus::Rejected));
        assert!(!ApprovalStatus::Rejected.can_transition_to(ApprovalStatus::Approved));
        assert!(!ApprovalStatus::Approved.can_transition_to(ApprovalStatus::Pending));
    }

    #[test]
    fn test_payment_transitions() {
        use PaymentStatus::*;

        assert!(Unset.can_transition_to(Processing));
        assert!(Unset.can_transition_to(ProviderFailed));
        assert!(Processing.can_transition_to(Settled));
        assert!(Processing.can_transition_to(ProviderFailed));

        assert!(!Unset.can_transition_to(Settled));
        assert!(!Processing.can_transition_to(Unset));
        assert!(!Settled.can_transition_to(ProviderFailed));
        assert!(!ProviderFailed.can_transition_to(Processing));
        assert!(Settled.is_terminal() && ProviderFailed.is_terminal());
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            PaymentStatus::Unset,
            PaymentStatus::Processing,
            PaymentStatus::Settled,
            PaymentStatus::ProviderFailed,
        ] {
            assert_eq!(PaymentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ApprovalStatus::from_str("approved"), Some(ApprovalStatus::Approved));
        assert_eq!(ApprovalStatus::from_str("expired"), None);
    }

    #[test]
    fn test_invariant_violations_detected() {
        let mut payment = sample_payment();
        payment.approval_status = ApprovalStatus::Rejected;
        payment.approved_by = Some(payment.initiated_by.clone());
        payment.payment_status = PaymentStatus::Processing;

        let violations = payment.invariant_violations();
        assert!(violations.contains(&"decided by its own initiator"));
        assert!(violations.contains(&"settlement state on a non-approved payment"));
        assert!(violations.contains(&"rejection reason present iff rejected"));
    }

    #[test]
    fn test_reference_format() {
        let reference = generate_transaction_reference(Utc::now());
        assert!(reference.starts_with("ISS-"));
        assert_eq!(reference.len(), "ISS-".len() + 14 + 1 + 12);
    }

    #[test]
    fn test_references_unique_in_batch() {
        let now = Utc::now();
        let refs: HashSet<String> = (0..10_000)
            .map(|_| generate_transaction_reference(now))
            .collect();
        assert_eq!(refs.len(), 10_000);
    }

    #[test]
    fn test_serialized_shape() {
        let payment = sample_payment();
        let json = serde_json::to_value(&payment).unwrap();

        assert_eq!(json["approvalStatus"], "pending");
        assert_eq!(json["paymentStatus"], "unset");
        assert_eq!(json["amount"], "5000");
        assert!(json["approvedBy"].is_null());
    }
}
