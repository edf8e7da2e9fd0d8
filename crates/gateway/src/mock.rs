//! Scripted gateway for tests and local runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::GatewayError;
use crate::gateway::PaymentGateway;
use crate::provider::{ProviderId, SettlementRequest, SettlementResult, StatusResult};
use crate::routing::{normalize, RoutingTable};

/// How the mock answers `submit`
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    Succeed { provider_reference: String },
    Fail { error: String },
    /// Simulates an unexpected crash inside the gateway call
    Panic,
}

/// Gateway double with call counters
#[derive(Debug)]
pub struct MockGateway {
    routing: RoutingTable,
    behavior: Mutex<MockBehavior>,
    status: Mutex<StatusResult>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    requests: Mutex<Vec<(ProviderId, SettlementRequest)>>,
}

impl MockGateway {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            routing: RoutingTable::default(),
            behavior: Mutex::new(behavior),
            status: Mutex::new(StatusResult::Pending),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(provider_reference: impl Into<String>) -> Self {
        Self::new(MockBehavior::Succeed {
            provider_reference: provider_reference.into(),
        })
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fail {
            error: error.into(),
        })
    }

    pub fn panicking() -> Self {
        Self::new(MockBehavior::Panic)
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    /// Answer for subsequent `check_status` calls
    pub fn set_status(&self, status: StatusResult) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Every submitted request, in order
    pub fn requests(&self) -> Vec<(ProviderId, SettlementRequest)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn normalize(&self, phone: &str) -> Result<String, GatewayError> {
        normalize(phone, "255")
    }

    fn route(&self, phone: &str) -> Result<ProviderId, GatewayError> {
        let normalized = self.normalize(phone)?;
        Ok(self
            .routing
            .route(normalized.strip_prefix("255").unwrap_or(&normalized)))
    }

    async fn submit(&self, provider: ProviderId, request: SettlementRequest) -> SettlementResult {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((provider, request));

        let behavior = self
            .behavior
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match behavior {
            MockBehavior::Succeed { provider_reference } => SettlementResult::Success {
                provider,
                provider_reference,
                raw: serde_json::json!({"mock": true}),
            },
            MockBehavior::Fail { error } => SettlementResult::failure(provider, error),
            MockBehavior::Panic => panic!("mock gateway crashed"),
        }
    }

    async fn check_status(&self, _provider: ProviderId, _provider_reference: &str) -> StatusResult {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
