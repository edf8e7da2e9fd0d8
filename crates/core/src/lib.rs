//! Union Payments Core - Domain types and collaborator interfaces
//!
//! This crate contains the types shared across the payment workflow:
//! - `Amount`: Strictly positive decimal wrapper for disbursements
//! - `Role`: Union roles and their separation-of-duties groupings
//! - `Directory`: Identity & role lookup (external identity provider)
//! - `AuditSink`: Fire-and-forget audit trail

pub mod amount;
pub mod audit;
pub mod directory;
pub mod role;

pub use amount::{Amount, AmountError};
pub use audit::{AuditAction, AuditEntry, AuditSink, MemoryAuditLog, TracingAuditSink};
pub use directory::{Caller, Directory, DirectoryError, InMemoryDirectory, SeedUser, UserRecord};
pub use role::Role;
