//! Application state

use std::sync::Arc;
use unionpay_core::Directory;
use unionpay_issuance::IssuanceService;

use crate::config::PageLimits;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IssuanceService>,
    pub directory: Arc<dyn Directory>,
    pub page_limits: PageLimits,
}

impl AppState {
    pub fn new(service: Arc<IssuanceService>, directory: Arc<dyn Directory>) -> Self {
        Self {
            service,
            directory,
            page_limits: PageLimits::default(),
        }
    }

    pub fn with_page_limits(mut self, page_limits: PageLimits) -> Self {
        self.page_limits = page_limits;
        self
    }
}
