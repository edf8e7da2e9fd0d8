//! Orchestrator errors

use thiserror::Error;
use unionpay_approval::{ApprovalStatus, StoreError};
use unionpay_core::DirectoryError;

/// Errors reported to callers of the issuance workflow.
///
/// Settlement failures after an approval are not errors; they are carried
/// in `SettlementReport`.
#[derive(Error, Debug)]
pub enum IssuanceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("You cannot approve or reject a payment you initiated")]
    SelfApproval { payment_id: String, user_id: String },

    #[error("Payment has already been {current}")]
    AlreadyDecided {
        payment_id: String,
        current: ApprovalStatus,
    },

    #[error("{0}")]
    Authorization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IssuanceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        IssuanceError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        IssuanceError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        IssuanceError::Authorization(msg.into())
    }

    pub fn is_already_decided(&self) -> bool {
        matches!(self, IssuanceError::AlreadyDecided { .. })
    }

    pub fn is_self_approval(&self) -> bool {
        matches!(self, IssuanceError::SelfApproval { .. })
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            IssuanceError::Validation(_) => "VALIDATION_ERROR",
            IssuanceError::NotFound(_) => "NOT_FOUND",
            IssuanceError::SelfApproval { .. } => "SELF_APPROVAL",
            IssuanceError::AlreadyDecided { .. } => "ALREADY_DECIDED",
            IssuanceError::Authorization(_) => "FORBIDDEN",
            IssuanceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for IssuanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => IssuanceError::Validation(msg),
            StoreError::NotFound(id) => IssuanceError::NotFound(format!("Payment not found: {id}")),
            StoreError::SelfApproval {
                payment_id,
                user_id,
            } => IssuanceError::SelfApproval {
                payment_id,
                user_id,
            },
            StoreError::AlreadyDecided {
                payment_id,
                current,
            } => IssuanceError::AlreadyDecided {
                payment_id,
                current,
            },
            e @ (StoreError::NotApproved { .. } | StoreError::InvalidTransition { .. }) => {
                IssuanceError::Validation(e.to_string())
            }
            e @ (StoreError::Database(_)
            | StoreError::ReferenceExhausted(_)
            | StoreError::InvalidData(_)) => IssuanceError::Internal(e.to_string()),
        }
    }
}

impl From<DirectoryError> for IssuanceError {
    fn from(err: DirectoryError) -> Self {
        IssuanceError::Internal(format!("directory unavailable: {err}"))
    }
}
