//! API Routes

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Payment issuance
        .route("/api/payments/initiate", post(handlers::initiate_payment))
        .route("/api/payments/pending", get(handlers::pending_payments))
        .route("/api/payments/history", get(handlers::payment_history))
        .route("/api/payments/stats", get(handlers::payment_stats))
        .route("/api/payments/:id", get(handlers::get_payment))
        .route("/api/payments/:id/approve", put(handlers::approve_payment))
        .route("/api/payments/:id/reject", put(handlers::reject_payment))
        .route("/api/payments/:id/reconcile", post(handlers::reconcile_payment))

        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
