//! Union Payments Issuance - The dual-authorization workflow
//!
//! `IssuanceService` ties the payment store, the identity directory, the
//! provider gateway and the audit sink together:
//!
//! ```text
//! initiate (financial authority) ──► pending
//! decide   (signatory ≠ initiator) ──► rejected
//!                                  └─► approved ──► submit ──► processing
//!                                                         └──► provider_failed
//! reconcile (admin) processing ──► settled | provider_failed
//! ```

pub mod error;
pub mod service;

pub use error::IssuanceError;
pub use service::{
    DecisionResult, InitiateRequest, IssuanceService, ReconcileResult, Result, SettlementReport,
};
