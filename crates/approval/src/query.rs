//! Listing filters, pagination and summary statistics

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::payment::{ApprovalStatus, PaymentStatus};

/// Filter for payment history queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub approval_status: Option<ApprovalStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub initiated_by: Option<String>,
    pub approved_by: Option<String>,
    pub issued_to: Option<String>,
    /// Inclusive lower bound on creation time
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time
    pub created_to: Option<DateTime<Utc>>,
}

impl PaymentFilter {
    pub fn pending() -> Self {
        Self {
            approval_status: Some(ApprovalStatus::Pending),
            ..Self::default()
        }
    }
}

/// Offset pagination, 1-based pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    /// Page numbers below 1 become 1, limits below 1 become 1
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: u64) -> Self {
        let limit = pagination.limit() as u64;
        Self {
            items,
            page: pagination.page(),
            limit: pagination.limit(),
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

/// Summary counts over all issued payments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub processing: u64,
    pub settled: u64,
    pub provider_failed: u64,
    /// Sum of amounts over approved payments
    pub approved_amount: Decimal,
}

impl PaymentStats {
    pub fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected
    }
}
