//! SQLite storage for issued payments
//!
//! Every state change is a single conditional `UPDATE`; the `WHERE` clause
//! carries the expected current state, so concurrent writers cannot both
//! succeed. Zero affected rows means the precondition failed, and the row
//! is re-read only to classify the error.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use thiserror::Error;
use tracing::{debug, warn};
use unionpay_core::Amount;

use crate::payment::{
    generate_transaction_reference, ApprovalStatus, Decision, IssuedPayment, NewPayment,
    PaymentStatus, SettlementOutcome,
};
use crate::query::{Page, Pagination, PaymentFilter, PaymentStats};

/// Attempts at generating a unique transaction reference
const MAX_REFERENCE_ATTEMPTS: u32 = 5;

/// Errors from the payment store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Payment not found: {0}")]
    NotFound(String),

    #[error("User {user_id} initiated payment {payment_id} and cannot decide on it")]
    SelfApproval { payment_id: String, user_id: String },

    #[error("Payment {payment_id} already {current}")]
    AlreadyDecided {
        payment_id: String,
        current: ApprovalStatus,
    },

    #[error("Payment {payment_id} is {current}, settlement requires approval")]
    NotApproved {
        payment_id: String,
        current: ApprovalStatus,
    },

    #[error("Payment {payment_id} cannot move from {from} to {to}")]
    InvalidTransition {
        payment_id: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Could not generate a unique transaction reference after {0} attempts")]
    ReferenceExhausted(u32),

    #[error("Corrupt payment row: {0}")]
    InvalidData(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_already_decided(&self) -> bool {
        matches!(self, StoreError::AlreadyDecided { .. })
    }
}

type ReferenceGenerator = Arc<dyn Fn(DateTime<Utc>) -> String + Send + Sync>;

/// Row type for the `issued_payments` table
#[derive(Debug, Clone, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    initiated_by: String,
    issued_to: String,
    amount: String,
    purpose: String,
    transaction_reference: String,
    approval_status: String,
    approved_by: Option<String>,
    approved_at: Option<String>,
    rejection_reason: Option<String>,
    payment_status: String,
    payment_provider: Option<String>,
    payment_provider_reference: Option<String>,
    provider_error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PaymentRow> for IssuedPayment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let amount = Decimal::from_str(&row.amount)
            .ok()
            .and_then(|d| Amount::new(d).ok())
            .ok_or_else(|| StoreError::InvalidData(format!("amount '{}'", row.amount)))?;
        let approval_status = ApprovalStatus::from_str(&row.approval_status).ok_or_else(|| {
            StoreError::InvalidData(format!("approval_status '{}'", row.approval_status))
        })?;
        let payment_status = PaymentStatus::from_str(&row.payment_status).ok_or_else(|| {
            StoreError::InvalidData(format!("payment_status '{}'", row.payment_status))
        })?;
        let approved_at = row.approved_at.as_deref().map(parse_timestamp).transpose()?;

        Ok(IssuedPayment {
            id: row.id,
            initiated_by: row.initiated_by,
            issued_to: row.issued_to,
            amount,
            purpose: row.purpose,
            transaction_reference: row.transaction_reference,
            approval_status,
            approved_by: row.approved_by,
            approved_at,
            rejection_reason: row.rejection_reason,
            payment_status,
            payment_provider: row.payment_provider,
            payment_provider_reference: row.payment_provider_reference,
            provider_error: row.provider_error,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidData(format!("timestamp '{s}'")))
}

/// SQLite-backed store for issued payments
#[derive(Clone)]
pub struct PaymentStore {
    pool: SqlitePool,
    reference_generator: ReferenceGenerator,
}

impl PaymentStore {
    /// Open (creating if missing) the database at the given URL,
    /// e.g. `sqlite:unionpay.db?mode=rwc`
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Create an in-memory store (for testing)
    ///
    /// A single, never-recycled connection: an in-memory database lives
    /// only as long as its connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and make sure the schema exists
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self {
            pool,
            reference_generator: Arc::new(generate_transaction_reference),
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Replace the transaction reference generator
    pub fn with_reference_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(DateTime<Utc>) -> String + Send + Sync + 'static,
    {
        self.reference_generator = Arc::new(generator);
        self
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS issued_payments (
                id TEXT PRIMARY KEY,
                initiated_by TEXT NOT NULL,
                issued_to TEXT NOT NULL,
                amount TEXT NOT NULL,
                purpose TEXT NOT NULL,
                transaction_reference TEXT NOT NULL UNIQUE,
                approval_status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (approval_status IN ('pending', 'approved', 'rejected')),
                approved_by TEXT,
                approved_at TEXT,
                rejection_reason TEXT,
                payment_status TEXT NOT NULL DEFAULT 'unset'
                    CHECK (payment_status IN ('unset', 'processing', 'settled', 'provider_failed')),
                payment_provider TEXT,
                payment_provider_reference TEXT,
                provider_error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (approved_by IS NULL OR approved_by <> initiated_by),
                CHECK (payment_status = 'unset' OR approval_status = 'approved'),
                CHECK ((approval_status = 'rejected') =
                       (rejection_reason IS NOT NULL AND length(trim(rejection_reason)) > 0))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_issued_payments_status
            ON issued_payments(approval_status, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_issued_payments_created
            ON issued_payments(created_at, id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create a pending payment with a fresh, unique transaction reference
    pub async fn create(&self, new: NewPayment) -> Result<IssuedPayment, StoreError> {
        let amount = Amount::new(new.amount).map_err(|e| StoreError::Validation(e.to_string()))?;
        let purpose = new.purpose.trim();
        if purpose.is_empty() {
            return Err(StoreError::Validation("purpose is required".to_string()));
        }
        if new.issued_to.trim().is_empty() {
            return Err(StoreError::Validation("recipient is required".to_string()));
        }

        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let reference = (self.reference_generator)(Utc::now());
            let payment =
                IssuedPayment::new(&new.initiated_by, &new.issued_to, amount, purpose, reference);

            match self.insert(&payment).await {
                Ok(()) => {
                    debug!(payment_id = %payment.id, reference = %payment.transaction_reference, "payment stored");
                    return Ok(payment);
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    warn!(
                        attempt,
                        reference = %payment.transaction_reference,
                        "transaction reference collision, regenerating"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::ReferenceExhausted(MAX_REFERENCE_ATTEMPTS))
    }

    async fn insert(&self, payment: &IssuedPayment) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO issued_payments
            (id, initiated_by, issued_to, amount, purpose, transaction_reference,
             approval_status, payment_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.initiated_by)
        .bind(&payment.issued_to)
        .bind(payment.amount.value().to_string())
        .bind(&payment.purpose)
        .bind(&payment.transaction_reference)
        .bind(payment.approval_status.as_str())
        .bind(payment.payment_status.as_str())
        .bind(format_timestamp(&payment.created_at))
        .bind(format_timestamp(&payment.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a payment by ID
    pub async fn get(&self, id: &str) -> Result<IssuedPayment, StoreError> {
        sqlx::query_as::<_, PaymentRow>("SELECT * FROM issued_payments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .try_into()
    }

    /// Get a payment by its transaction reference
    pub async fn get_by_reference(&self, reference: &str) -> Result<IssuedPayment, StoreError> {
        sqlx::query_as::<_, PaymentRow>(
            "SELECT * FROM issued_payments WHERE transaction_reference = ?",
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(reference.to_string()))?
        .try_into()
    }

    /// List payments awaiting a decision, newest first
    pub async fn list_pending(
        &self,
        pagination: Pagination,
    ) -> Result<Page<IssuedPayment>, StoreError> {
        self.list_by_filter(&PaymentFilter::pending(), pagination)
            .await
    }

    /// List payments matching a filter, newest first (ties broken by ID)
    pub async fn list_by_filter(
        &self,
        filter: &PaymentFilter,
        pagination: Pagination,
    ) -> Result<Page<IssuedPayment>, StoreError> {
        let mut count = filtered_query("SELECT COUNT(*) FROM issued_payments", filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = filtered_query("SELECT * FROM issued_payments", filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(pagination.limit() as i64)
            .push(" OFFSET ")
            .push_bind(pagination.offset() as i64);

        let rows = select
            .build_query_as::<PaymentRow>()
            .fetch_all(&self.pool)
            .await?;
        let items = rows
            .into_iter()
            .map(IssuedPayment::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, pagination, total.max(0) as u64))
    }

    /// Record a signatory decision.
    ///
    /// Applied only while the payment is pending and the decider is not
    /// the initiator; otherwise fails with `AlreadyDecided` or
    /// `SelfApproval` and nothing is written.
    pub async fn record_decision(
        &self,
        id: &str,
        decided_by: &str,
        decision: &Decision,
    ) -> Result<IssuedPayment, StoreError> {
        let reason = match decision {
            Decision::Approve => None,
            Decision::Reject { reason } => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(StoreError::Validation(
                        "rejection reason is required".to_string(),
                    ));
                }
                Some(reason.to_string())
            }
        };

        let now = format_timestamp(&Utc::now());
        let result = sqlx::query(
            r#"
            UPDATE issued_payments
            SET approval_status = ?, approved_by = ?, approved_at = ?,
                rejection_reason = ?, updated_at = ?
            WHERE id = ? AND approval_status = 'pending' AND initiated_by <> ?
            "#,
        )
        .bind(decision.target_status().as_str())
        .bind(decided_by)
        .bind(&now)
        .bind(reason)
        .bind(&now)
        .bind(id)
        .bind(decided_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get(id).await?;
            if current.approval_status.is_terminal() {
                return Err(StoreError::AlreadyDecided {
                    payment_id: id.to_string(),
                    current: current.approval_status,
                });
            }
            if current.initiated_by == decided_by {
                return Err(StoreError::SelfApproval {
                    payment_id: id.to_string(),
                    user_id: decided_by.to_string(),
                });
            }
            return Err(StoreError::InvalidData(format!(
                "decision on payment {id} was not applied"
            )));
        }

        self.get(id).await
    }

    /// Record the outcome of a settlement attempt or status query.
    ///
    /// Only valid on approved payments, and only along the legal
    /// payment-status transitions.
    pub async fn record_settlement_outcome(
        &self,
        id: &str,
        outcome: &SettlementOutcome,
    ) -> Result<IssuedPayment, StoreError> {
        let target = outcome.target_status();
        let (provider, provider_reference, provider_error) = match outcome {
            SettlementOutcome::Processing {
                provider,
                provider_reference,
            } => (Some(provider.clone()), Some(provider_reference.clone()), None),
            SettlementOutcome::Settled => (None, None, None),
            SettlementOutcome::ProviderFailed { provider, error } => {
                (provider.clone(), None, Some(error.clone()))
            }
        };

        // Status names are fixed identifiers, never user input
        let allowed = PaymentStatus::predecessors(target)
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            UPDATE issued_payments
            SET payment_status = ?,
                payment_provider = COALESCE(?, payment_provider),
                payment_provider_reference = COALESCE(?, payment_provider_reference),
                provider_error = ?,
                updated_at = ?
            WHERE id = ? AND approval_status = 'approved' AND payment_status IN ({allowed})
            "#
        );

        let result = sqlx::query(&sql)
            .bind(target.as_str())
            .bind(provider)
            .bind(provider_reference)
            .bind(provider_error)
            .bind(format_timestamp(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            let current = self.get(id).await?;
            if current.approval_status != ApprovalStatus::Approved {
                return Err(StoreError::NotApproved {
                    payment_id: id.to_string(),
                    current: current.approval_status,
                });
            }
            return Err(StoreError::InvalidTransition {
                payment_id: id.to_string(),
                from: current.payment_status,
                to: target,
            });
        }

        self.get(id).await
    }

    /// Summary counts across all payments
    pub async fn stats(&self) -> Result<PaymentStats, StoreError> {
        let groups: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT approval_status, payment_status, COUNT(*)
            FROM issued_payments
            GROUP BY approval_status, payment_status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = PaymentStats::default();
        for (approval, payment, count) in groups {
            let count = count.max(0) as u64;
            match ApprovalStatus::from_str(&approval) {
                Some(ApprovalStatus::Pending) => stats.pending += count,
                Some(ApprovalStatus::Approved) => stats.approved += count,
                Some(ApprovalStatus::Rejected) => stats.rejected += count,
                None => return Err(StoreError::InvalidData(format!("approval_status '{approval}'"))),
            }
            match PaymentStatus::from_str(&payment) {
                Some(PaymentStatus::Processing) => stats.processing += count,
                Some(PaymentStatus::Settled) => stats.settled += count,
                Some(PaymentStatus::ProviderFailed) => stats.provider_failed += count,
                Some(PaymentStatus::Unset) => {}
                None => return Err(StoreError::InvalidData(format!("payment_status '{payment}'"))),
            }
        }

        // Amounts are TEXT; summed as Decimal to avoid float rounding
        let amounts: Vec<String> = sqlx::query_scalar(
            "SELECT amount FROM issued_payments WHERE approval_status = 'approved'",
        )
        .fetch_all(&self.pool)
        .await?;
        for amount in amounts {
            stats.approved_amount += Decimal::from_str(&amount)
                .map_err(|_| StoreError::InvalidData(format!("amount '{amount}'")))?;
        }

        Ok(stats)
    }
}

fn filtered_query(select: &str, filter: &PaymentFilter) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(select);
    qb.push(" WHERE 1 = 1");

    if let Some(status) = filter.approval_status {
        qb.push(" AND approval_status = ").push_bind(status.as_str());
    }
    if let Some(status) = filter.payment_status {
        qb.push(" AND payment_status = ").push_bind(status.as_str());
    }
    if let Some(user) = &filter.initiated_by {
        qb.push(" AND initiated_by = ").push_bind(user.clone());
    }
    if let Some(user) = &filter.approved_by {
        qb.push(" AND approved_by = ").push_bind(user.clone());
    }
    if let Some(user) = &filter.issued_to {
        qb.push(" AND issued_to = ").push_bind(user.clone());
    }
    if let Some(from) = &filter.created_from {
        qb.push(" AND created_at >= ").push_bind(format_timestamp(from));
    }
    if let Some(to) = &filter.created_to {
        qb.push(" AND created_at <= ").push_bind(format_timestamp(to));
    }

    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_payment(initiated_by: &str, issued_to: &str) -> NewPayment {
        NewPayment {
            initiated_by: initiated_by.to_string(),
            issued_to: issued_to.to_string(),
            amount: dec!(5000),
            purpose: "Travel reimbursement".to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_create_and_get() {
        let store = PaymentStore::in_memory().await.unwrap();
        let created = store.create(new_payment("finance-1", "member-1")).await.unwrap();

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.approval_status, ApprovalStatus::Pending);
        assert_eq!(fetched.payment_status, PaymentStatus::Unset);

        let by_ref = store
            .get_by_reference(&created.transaction_reference)
            .await
            .unwrap();
        assert_eq!(by_ref.id, created.id);
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let store = PaymentStore::in_memory().await.unwrap();

        let mut zero = new_payment("finance-1", "member-1");
        zero.amount = dec!(0);
        assert!(matches!(store.create(zero).await, Err(StoreError::Validation(_))));

        let mut blank = new_payment("finance-1", "member-1");
        blank.purpose = "   ".to_string();
        assert!(matches!(store.create(blank).await, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = PaymentStore::in_memory().await.unwrap();
        let result = store.get("does-not-exist").await;
        assert!(matches!(result, Err(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_reference_collision_is_retried() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let store = PaymentStore::in_memory()
            .await
            .unwrap()
            .with_reference_generator(move |_| {
                // Second call collides with the first, third is fresh
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => "ISS-DUPLICATE".to_string(),
                    n => format!("ISS-FRESH-{n}"),
                }
            });

        let first = store.create(new_payment("f", "m")).await.unwrap();
        let second = store.create(new_payment("f", "m")).await.unwrap();

        assert_eq!(first.transaction_reference, "ISS-DUPLICATE");
        assert_eq!(second.transaction_reference, "ISS-FRESH-2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_reference_exhaustion() {
        let store = PaymentStore::in_memory()
            .await
            .unwrap()
            .with_reference_generator(|_| "ISS-CONSTANT".to_string());

        store.create(new_payment("f", "m")).await.unwrap();
        let result = store.create(new_payment("f", "m")).await;
        assert!(matches!(result, Err(StoreError::ReferenceExhausted(5))));
    }

    #[tokio::test]
    async fn test_record_decision_approve() {
        let store = PaymentStore::in_memory().await.unwrap();
        let created = store.create(new_payment("finance-1", "member-1")).await.unwrap();

        let approved = store
            .record_decision(&created.id, "signatory-1", &Decision::Approve)
            .await
            .unwrap();

        assert_eq!(approved.approval_status, ApprovalStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("signatory-1"));
        assert!(approved.approved_at.is_some());
        assert!(approved.rejection_reason.is_none());
        assert!(approved.invariant_violations().is_empty());
    }

    #[tokio::test]
    async fn test_record_decision_requires_reason() {
        let store = PaymentStore::in_memory().await.unwrap();
        let created = store.create(new_payment("finance-1", "member-1")).await.unwrap();

        let result = store
            .record_decision(&created.id, "signatory-1", &Decision::reject("  "))
            .await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let unchanged = store.get(&created.id).await.unwrap();
        assert!(unchanged.is_pending());
    }

    #[tokio::test]
    async fn test_self_decision_rejected() {
        let store = PaymentStore::in_memory().await.unwrap();
        let created = store.create(new_payment("finance-1", "member-1")).await.unwrap();

        let result = store
            .record_decision(&created.id, "finance-1", &Decision::Approve)
            .await;
        assert!(matches!(result, Err(StoreError::SelfApproval { .. })));
        assert!(store.get(&created.id).await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_second_decision_fails() {
        let store = PaymentStore::in_memory().await.unwrap();
        let created = store.create(new_payment("finance-1", "member-1")).await.unwrap();

        store
            .record_decision(&created.id, "signatory-1", &Decision::reject("duplicate request"))
            .await
            .unwrap();

        let result = store
            .record_decision(&created.id, "signatory-2", &Decision::Approve)
            .await;
        match result {
            Err(StoreError::AlreadyDecided { current, .. }) => {
                assert_eq!(current, ApprovalStatus::Rejected)
            }
            other => panic!("expected AlreadyDecided, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_settlement_requires_approval() {
        let store = PaymentStore::in_memory().await.unwrap();
        let created = store.create(new_payment("finance-1", "member-1")).await.unwrap();

        let outcome = SettlementOutcome::Processing {
            provider: "vodacom".to_string(),
            provider_reference: "PR-1".to_string(),
        };
        let result = store.record_settlement_outcome(&created.id, &outcome).await;
        assert!(matches!(result, Err(StoreError::NotApproved { .. })));
        assert_eq!(
            store.get(&created.id).await.unwrap().payment_status,
            PaymentStatus::Unset
        );
    }

    #[tokio::test]
    async fn test_settlement_transitions() {
        let store = PaymentStore::in_memory().await.unwrap();
        let created = store.create(new_payment("finance-1", "member-1")).await.unwrap();
        store
            .record_decision(&created.id, "signatory-1", &Decision::Approve)
            .await
            .unwrap();

        // Settled cannot be entered from Unset
        let early = store
            .record_settlement_outcome(&created.id, &SettlementOutcome::Settled)
            .await;
        assert!(matches!(early, Err(StoreError::InvalidTransition { .. })));

        let processing = store
            .record_settlement_outcome(
                &created.id,
                &SettlementOutcome::Processing {
                    provider: "tigo".to_string(),
                    provider_reference: "TX-9".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(processing.payment_status, PaymentStatus::Processing);
        assert_eq!(processing.payment_provider.as_deref(), Some("tigo"));
        assert_eq!(processing.payment_provider_reference.as_deref(), Some("TX-9"));

        let settled = store
            .record_settlement_outcome(&created.id, &SettlementOutcome::Settled)
            .await
            .unwrap();
        assert_eq!(settled.payment_status, PaymentStatus::Settled);
        // Provider details survive the transition
        assert_eq!(settled.payment_provider_reference.as_deref(), Some("TX-9"));

        let after_terminal = store
            .record_settlement_outcome(
                &created.id,
                &SettlementOutcome::ProviderFailed {
                    provider: None,
                    error: "late failure".to_string(),
                },
            )
            .await;
        assert!(matches!(after_terminal, Err(StoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_list_pending_excludes_decided() {
        let store = PaymentStore::in_memory().await.unwrap();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(store.create(new_payment("finance-1", "member-1")).await.unwrap().id);
        }
        store
            .record_decision(&ids[0], "signatory-1", &Decision::Approve)
            .await
            .unwrap();

        let page = store.list_pending(Pagination::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|p| p.is_pending()));
        assert!(!page.items.iter().any(|p| p.id == ids[0]));
    }

    #[tokio::test]
    async fn test_stats() {
        let store = PaymentStore::in_memory().await.unwrap();
        let a = store.create(new_payment("f", "m")).await.unwrap();
        let b = store.create(new_payment("f", "m")).await.unwrap();
        store.create(new_payment("f", "m")).await.unwrap();

        store.record_decision(&a.id, "s", &Decision::Approve).await.unwrap();
        store
            .record_settlement_outcome(
                &a.id,
                &SettlementOutcome::ProviderFailed {
                    provider: Some("airtel".to_string()),
                    error: "timeout".to_string(),
                },
            )
            .await
            .unwrap();
        store.record_decision(&b.id, "s", &Decision::reject("no")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.provider_failed, 1);
        assert_eq!(stats.approved_amount, dec!(5000));
        assert_eq!(stats.total(), 3);
    }
}
