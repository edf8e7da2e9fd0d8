//! API Handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unionpay_approval::{
    ApprovalStatus, IssuedPayment, Page, Pagination, PaymentFilter, PaymentStats, PaymentStatus,
};
use unionpay_issuance::{DecisionResult, InitiateRequest, ReconcileResult};

use crate::auth::AuthUser;
use crate::config::PageLimits;
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============ Response Types ============

/// Uniform response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn error_with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

// ============ Request Types ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub approval_status: Option<String>,
    pub payment_status: Option<String>,
    pub initiated_by: Option<String>,
    pub approved_by: Option<String>,
    pub issued_to: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl HistoryQuery {
    fn filter(&self) -> Result<PaymentFilter, ApiError> {
        let approval_status = self
            .approval_status
            .as_deref()
            .map(|s| {
                ApprovalStatus::from_str(s)
                    .ok_or_else(|| ApiError::bad_request(format!("Invalid approvalStatus: {s}")))
            })
            .transpose()?;
        let payment_status = self
            .payment_status
            .as_deref()
            .map(|s| {
                PaymentStatus::from_str(s)
                    .ok_or_else(|| ApiError::bad_request(format!("Invalid paymentStatus: {s}")))
            })
            .transpose()?;

        Ok(PaymentFilter {
            approval_status,
            payment_status,
            initiated_by: self.initiated_by.clone(),
            approved_by: self.approved_by.clone(),
            issued_to: self.issued_to.clone(),
            created_from: self.from,
            created_to: self.to,
        })
    }
}

fn pagination(limits: PageLimits, page: Option<u32>, limit: Option<u32>) -> Pagination {
    Pagination::new(
        page.unwrap_or(1),
        limit.unwrap_or(limits.default_size).min(limits.max_size),
    )
}

// ============ Handlers ============

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// Initiate a disbursement (financial authorities)
pub async fn initiate_payment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<InitiateRequest>, JsonRejection>,
) -> ApiResult<IssuedPayment> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let payment = state.service.initiate(&caller, request).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Payment initiated and awaiting signatory approval",
        payment,
    )))
}

/// Approve a pending payment and trigger settlement (signatories)
pub async fn approve_payment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<DecisionResult> {
    let result = state.service.approve(&caller, &id).await?;

    let message = match &result.settlement {
        Some(report) if report.succeeded() => {
            "Payment approved and sent to the payment provider".to_string()
        }
        Some(report) => format!(
            "Payment approved, but settlement failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        ),
        None => "Payment approved".to_string(),
    };

    Ok(Json(ApiResponse::success_with_message(message, result)))
}

/// Reject a pending payment (signatories)
pub async fn reject_payment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<RejectRequest>, JsonRejection>,
) -> ApiResult<DecisionResult> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let reason = body
        .rejection_reason
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Rejection reason is required"))?;

    let result = state.service.reject(&caller, &id, reason).await?;
    Ok(Json(ApiResponse::success_with_message("Payment rejected", result)))
}

/// Payments awaiting a decision (signatories)
pub async fn pending_payments(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Page<IssuedPayment>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let page = state
        .service
        .list_pending(&caller, pagination(state.page_limits, query.page, query.limit))
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// Filtered payment history (officers)
pub async fn payment_history(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Page<IssuedPayment>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let filter = query.filter()?;
    let page = state
        .service
        .history(
            &caller,
            &filter,
            pagination(state.page_limits, query.page, query.limit),
        )
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// Get a single payment (officers)
pub async fn get_payment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<IssuedPayment> {
    let payment = state.service.get(&caller, &id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

/// Summary counts (officers)
pub async fn payment_stats(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<PaymentStats> {
    let stats = state.service.stats(&caller).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Query the provider for a processing payment (officers)
pub async fn reconcile_payment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ReconcileResult> {
    let result = state.service.reconcile(&caller, &id).await?;
    let message = if result.updated {
        format!("Payment status updated to {}", result.payment.payment_status)
    } else {
        "Payment still awaiting provider confirmation".to_string()
    };
    Ok(Json(ApiResponse::success_with_message(message, result)))
}
