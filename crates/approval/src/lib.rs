//! Union Payments Approval - Issued payments and their authorization state machine
//!
//! # Key Types
//! - `IssuedPayment`: One disbursement request and its lifecycle
//! - `ApprovalStatus` / `PaymentStatus`: The two independent status axes
//! - `PaymentStore`: SQLite store; every transition is a conditional update
//! - `PaymentFilter` / `Pagination` / `Page`: History queries

pub mod payment;
pub mod query;
pub mod store;

pub use payment::{
    generate_transaction_reference, ApprovalStatus, Decision, IssuedPayment, NewPayment,
    PaymentStatus, SettlementOutcome,
};
pub use query::{Page, Pagination, PaymentFilter, PaymentStats};
pub use store::{PaymentStore, StoreError};
