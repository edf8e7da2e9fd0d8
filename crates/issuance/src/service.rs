//! Issuance orchestrator
//!
//! Sequences one payment through initiation, a signatory decision and,
//! on approval, a single settlement attempt. Approval is committed before
//! the provider is called and is never rolled back because of it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use unionpay_approval::{
    Decision, IssuedPayment, NewPayment, Page, Pagination, PaymentFilter, PaymentStats,
    PaymentStatus, PaymentStore, SettlementOutcome,
};
use unionpay_core::{AuditAction, AuditEntry, AuditSink, Caller, Directory};
use unionpay_gateway::{PaymentGateway, ProviderId, SettlementRequest, SettlementResult, StatusResult};

use crate::error::IssuanceError;

pub type Result<T> = std::result::Result<T, IssuanceError>;

/// Request to initiate a disbursement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub issued_to: String,
    pub amount: Decimal,
    pub purpose: String,
}

/// Outcome of the settlement attempt that follows an approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub status: PaymentStatus,
    pub provider: Option<String>,
    pub provider_reference: Option<String>,
    pub error: Option<String>,
}

impl SettlementReport {
    pub fn succeeded(&self) -> bool {
        self.status == PaymentStatus::Processing
    }

    fn from_payment(payment: &IssuedPayment) -> Self {
        Self {
            status: payment.payment_status,
            provider: payment.payment_provider.clone(),
            provider_reference: payment.payment_provider_reference.clone(),
            error: payment.provider_error.clone(),
        }
    }
}

/// Result of a decision: the committed record, plus the settlement
/// outcome when the decision was an approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub payment: IssuedPayment,
    pub settlement: Option<SettlementReport>,
}

/// Result of a provider status reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    pub payment: IssuedPayment,
    pub provider_status: StatusResult,
    /// Whether the stored record changed
    pub updated: bool,
}

/// The payment issuance workflow
pub struct IssuanceService {
    store: PaymentStore,
    directory: Arc<dyn Directory>,
    gateway: Arc<dyn PaymentGateway>,
    audit: Arc<dyn AuditSink>,
}

impl IssuanceService {
    pub fn new(
        store: PaymentStore,
        directory: Arc<dyn Directory>,
        gateway: Arc<dyn PaymentGateway>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            directory,
            gateway,
            audit,
        }
    }

    pub fn store(&self) -> &PaymentStore {
        &self.store
    }

    fn settlement(&self) -> Settlement {
        Settlement {
            store: self.store.clone(),
            directory: Arc::clone(&self.directory),
            gateway: Arc::clone(&self.gateway),
            audit: Arc::clone(&self.audit),
        }
    }

    /// Create a pending disbursement request. No provider is contacted.
    pub async fn initiate(&self, caller: &Caller, request: InitiateRequest) -> Result<IssuedPayment> {
        if !caller.role.is_financial_authority() {
            warn!(user_id = %caller.user_id, role = %caller.role, "payment initiation denied");
            return Err(IssuanceError::forbidden(
                "Only financial authorities (chairperson, treasurer) can initiate payments",
            ));
        }

        let issued_to = request.issued_to.trim();
        if issued_to.is_empty() {
            return Err(IssuanceError::validation("Recipient is required"));
        }
        if issued_to == caller.user_id {
            return Err(IssuanceError::validation(
                "You cannot issue a payment to yourself",
            ));
        }
        match self.directory.get_user(issued_to).await? {
            Some(user) if user.is_eligible_recipient() => {}
            _ => {
                return Err(IssuanceError::not_found(format!(
                    "Recipient not found or not an active member: {issued_to}"
                )))
            }
        }

        let payment = self
            .store
            .create(NewPayment {
                initiated_by: caller.user_id.clone(),
                issued_to: issued_to.to_string(),
                amount: request.amount,
                purpose: request.purpose,
            })
            .await
            .inspect_err(|e| warn!(user_id = %caller.user_id, error = %e, "payment initiation failed"))?;

        info!(
            payment_id = %payment.id,
            reference = %payment.transaction_reference,
            initiated_by = %payment.initiated_by,
            issued_to = %payment.issued_to,
            amount = %payment.amount,
            "payment initiated"
        );
        self.audit.record(AuditEntry::payment(
            &caller.user_id,
            AuditAction::PaymentInitiated,
            &payment.id,
            json!({
                "issuedTo": payment.issued_to,
                "amount": payment.amount.to_string(),
                "purpose": payment.purpose,
                "transactionReference": payment.transaction_reference,
            }),
        ));

        Ok(payment)
    }

    /// Approve a pending payment and attempt settlement
    pub async fn approve(&self, caller: &Caller, payment_id: &str) -> Result<DecisionResult> {
        self.decide(caller, payment_id, Decision::Approve).await
    }

    /// Reject a pending payment. No provider is contacted.
    pub async fn reject(
        &self,
        caller: &Caller,
        payment_id: &str,
        reason: impl Into<String>,
    ) -> Result<DecisionResult> {
        self.decide(caller, payment_id, Decision::reject(reason))
            .await
    }

    /// Record a signatory decision; on approval, settle immediately
    pub async fn decide(
        &self,
        caller: &Caller,
        payment_id: &str,
        decision: Decision,
    ) -> Result<DecisionResult> {
        if !caller.role.is_signatory() {
            warn!(user_id = %caller.user_id, role = %caller.role, payment_id, "payment decision denied");
            return Err(IssuanceError::forbidden(
                "Only signatories can approve or reject payments",
            ));
        }

        let payment = self
            .store
            .record_decision(payment_id, &caller.user_id, &decision)
            .await
            .inspect_err(|e| {
                warn!(payment_id, user_id = %caller.user_id, error = %e, "payment decision refused")
            })?;

        let (action, details) = match &decision {
            Decision::Approve => (
                AuditAction::PaymentApproved,
                json!({
                    "amount": payment.amount.to_string(),
                    "issuedTo": payment.issued_to,
                    "transactionReference": payment.transaction_reference,
                }),
            ),
            Decision::Reject { .. } => (
                AuditAction::PaymentRejected,
                json!({
                    "rejectionReason": payment.rejection_reason,
                    "transactionReference": payment.transaction_reference,
                }),
            ),
        };
        info!(
            payment_id,
            decided_by = %caller.user_id,
            status = %payment.approval_status,
            "payment decided"
        );
        self.audit
            .record(AuditEntry::payment(&caller.user_id, action, payment_id, details));

        if !decision.is_approve() {
            return Ok(DecisionResult {
                payment,
                settlement: None,
            });
        }

        // Detached: the outcome is recorded even if this request is dropped
        let settlement = self.settlement();
        let actor = caller.user_id.clone();
        let approved = payment.clone();
        let (payment, report) =
            match tokio::spawn(async move { settlement.run(actor, approved).await }).await {
                Ok(settled) => settled,
                Err(e) => {
                    error!(payment_id = %payment.id, error = %e, "settlement task aborted");
                    let report = SettlementReport {
                        status: payment.payment_status,
                        provider: None,
                        provider_reference: None,
                        error: Some(format!("Settlement task aborted: {e}")),
                    };
                    (payment, report)
                }
            };
        Ok(DecisionResult {
            payment,
            settlement: Some(report),
        })
    }

    /// Ask the provider about a `processing` payment and record a final
    /// answer. Never submits.
    pub async fn reconcile(&self, caller: &Caller, payment_id: &str) -> Result<ReconcileResult> {
        require_admin(caller)?;

        let payment = self.store.get(payment_id).await?;
        if payment.payment_status != PaymentStatus::Processing {
            return Err(IssuanceError::validation(format!(
                "Payment is not awaiting settlement (payment status: {})",
                payment.payment_status
            )));
        }

        let (provider, reference) = match (
            payment.payment_provider.as_deref(),
            payment.payment_provider_reference.as_deref(),
        ) {
            (Some(provider), Some(reference)) => (
                ProviderId::parse(provider).map_err(|e| IssuanceError::Internal(e.to_string()))?,
                reference.to_string(),
            ),
            _ => {
                return Err(IssuanceError::Internal(format!(
                    "processing payment {payment_id} has no provider reference"
                )))
            }
        };

        let status = self.gateway.check_status(provider, &reference).await;
        info!(payment_id, %provider, %reference, status = ?status, "provider status checked");

        let outcome = match &status {
            StatusResult::Completed => SettlementOutcome::Settled,
            StatusResult::Failed { reason } => SettlementOutcome::ProviderFailed {
                provider: None,
                error: reason.clone(),
            },
            StatusResult::Pending | StatusResult::Unknown { .. } => {
                return Ok(ReconcileResult {
                    payment,
                    provider_status: status,
                    updated: false,
                })
            }
        };

        let updated = self
            .store
            .record_settlement_outcome(payment_id, &outcome)
            .await?;

        let (action, details) = match &outcome {
            SettlementOutcome::ProviderFailed { error, .. } => (
                AuditAction::PaymentProviderFailed,
                json!({ "provider": provider.as_str(), "error": error, "source": "reconcile" }),
            ),
            _ => (
                AuditAction::PaymentSettled,
                json!({ "provider": provider.as_str(), "providerReference": reference }),
            ),
        };
        self.audit
            .record(AuditEntry::payment(&caller.user_id, action, payment_id, details));

        Ok(ReconcileResult {
            payment: updated,
            provider_status: status,
            updated: true,
        })
    }

    pub async fn get(&self, caller: &Caller, payment_id: &str) -> Result<IssuedPayment> {
        require_admin(caller)?;
        Ok(self.store.get(payment_id).await?)
    }

    /// Payments awaiting a decision
    pub async fn list_pending(
        &self,
        caller: &Caller,
        pagination: Pagination,
    ) -> Result<Page<IssuedPayment>> {
        if !caller.role.is_signatory() {
            return Err(IssuanceError::forbidden(
                "Only signatories can view pending payments",
            ));
        }
        Ok(self.store.list_pending(pagination).await?)
    }

    pub async fn history(
        &self,
        caller: &Caller,
        filter: &PaymentFilter,
        pagination: Pagination,
    ) -> Result<Page<IssuedPayment>> {
        require_admin(caller)?;
        Ok(self.store.list_by_filter(filter, pagination).await?)
    }

    pub async fn stats(&self, caller: &Caller) -> Result<PaymentStats> {
        require_admin(caller)?;
        Ok(self.store.stats().await?)
    }
}

/// Collaborators for one settlement attempt, owned so the attempt can
/// outlive the request that triggered it
struct Settlement {
    store: PaymentStore,
    directory: Arc<dyn Directory>,
    gateway: Arc<dyn PaymentGateway>,
    audit: Arc<dyn AuditSink>,
}

impl Settlement {
    /// One settlement attempt for a freshly approved payment. Every failure
    /// here is recorded as `provider_failed`; none escapes as an error.
    async fn run(self, actor: String, payment: IssuedPayment) -> (IssuedPayment, SettlementReport) {
        let outcome = match self.submit(&actor, &payment).await {
            Ok(SettlementResult::Success {
                provider,
                provider_reference,
                ..
            }) => SettlementOutcome::Processing {
                provider: provider.to_string(),
                provider_reference,
            },
            Ok(SettlementResult::Failure { provider, error }) => SettlementOutcome::ProviderFailed {
                provider: Some(provider.to_string()),
                error,
            },
            Err(error) => SettlementOutcome::ProviderFailed {
                provider: None,
                error,
            },
        };

        let updated = match self
            .store
            .record_settlement_outcome(&payment.id, &outcome)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                error!(payment_id = %payment.id, error = %e, "failed to record settlement outcome");
                let report = SettlementReport {
                    status: payment.payment_status,
                    provider: None,
                    provider_reference: None,
                    error: Some(format!("Settlement outcome could not be recorded: {e}")),
                };
                return (payment, report);
            }
        };

        match &outcome {
            SettlementOutcome::Processing {
                provider,
                provider_reference,
            } => {
                info!(payment_id = %updated.id, %provider, %provider_reference, "settlement initiated");
                self.audit.record(AuditEntry::payment(
                    &actor,
                    AuditAction::PaymentProviderInitiated,
                    &updated.id,
                    json!({
                        "provider": provider,
                        "providerReference": provider_reference,
                        "transactionReference": updated.transaction_reference,
                    }),
                ));
            }
            SettlementOutcome::ProviderFailed { provider, error } => {
                warn!(payment_id = %updated.id, provider = ?provider, %error, "settlement failed, approval stands");
                self.audit.record(AuditEntry::payment(
                    &actor,
                    AuditAction::PaymentProviderFailed,
                    &updated.id,
                    json!({
                        "provider": provider,
                        "error": error,
                        "transactionReference": updated.transaction_reference,
                    }),
                ));
            }
            SettlementOutcome::Settled => {}
        }

        let report = SettlementReport::from_payment(&updated);
        (updated, report)
    }

    /// Resolve the recipient, route and submit. `Err` carries the message
    /// for failures that happen before or around the provider call.
    async fn submit(
        &self,
        actor: &str,
        payment: &IssuedPayment,
    ) -> std::result::Result<SettlementResult, String> {
        let recipient = self
            .directory
            .get_user(&payment.issued_to)
            .await
            .map_err(|e| format!("Recipient lookup failed: {e}"))?
            .ok_or_else(|| format!("Recipient not found: {}", payment.issued_to))?;

        if !recipient.is_active {
            return Err("Recipient is inactive".to_string());
        }

        let phone = recipient
            .phone_number
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| "Recipient has no phone number on file".to_string())?;

        let provider = self.gateway.route(&phone).map_err(|e| e.to_string())?;

        let request = SettlementRequest {
            amount: payment.amount.value(),
            recipient_phone: phone,
            recipient_name: recipient.full_name,
            purpose: payment.purpose.clone(),
            transaction_reference: payment.transaction_reference.clone(),
            initiator: actor.to_string(),
        };

        // A crashing provider must not take the recording step down with it
        let gateway = Arc::clone(&self.gateway);
        tokio::spawn(async move { gateway.submit(provider, request).await })
            .await
            .map_err(|e| format!("Settlement call aborted: {e}"))
    }
}

fn require_admin(caller: &Caller) -> Result<()> {
    if caller.role.is_admin() {
        Ok(())
    } else {
        Err(IssuanceError::forbidden("Admin access required"))
    }
}
