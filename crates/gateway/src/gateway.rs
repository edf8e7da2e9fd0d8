//! Provider gateway: one interface over all settlement backends

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::provider::{
    ProviderId, SettlementProvider, SettlementRequest, SettlementResult, StatusResult,
};
use crate::providers::{build_http_client, AirtelProvider, TigoProvider, VodacomProvider};
use crate::routing::{normalize, RoutingTable};

/// What the orchestrator needs from settlement
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Normalize a phone number to international digits
    fn normalize(&self, phone: &str) -> Result<String, GatewayError>;

    /// Pick the provider for a recipient phone number
    fn route(&self, phone: &str) -> Result<ProviderId, GatewayError>;

    /// Submit a settlement. Failures are values, never errors.
    async fn submit(&self, provider: ProviderId, request: SettlementRequest) -> SettlementResult;

    /// Best-effort status query
    async fn check_status(&self, provider: ProviderId, provider_reference: &str) -> StatusResult;
}

/// Gateway over the real mobile-money providers
pub struct MobileMoneyGateway {
    routing: RoutingTable,
    country_code: String,
    providers: HashMap<ProviderId, Arc<dyn SettlementProvider>>,
}

impl MobileMoneyGateway {
    /// Gateway with no providers registered
    pub fn new(routing: RoutingTable, country_code: impl Into<String>) -> Self {
        Self {
            routing,
            country_code: country_code.into(),
            providers: HashMap::new(),
        }
    }

    /// Gateway with Vodacom, Tigo and Airtel sharing one HTTP client
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let client = build_http_client(config.timeout())?;

        let gateway = Self::new(config.routing()?, config.country_code.clone())
            .with_provider(Arc::new(VodacomProvider::new(client.clone(), config)))
            .with_provider(Arc::new(TigoProvider::new(client.clone(), config)))
            .with_provider(Arc::new(AirtelProvider::new(client, config)));

        for id in ProviderId::ALL {
            info!(
                provider = %id,
                enabled = config.provider(id).enabled,
                prefixes = ?gateway.routing.prefixes_for(id),
                "payment provider configured"
            );
        }

        Ok(gateway)
    }

    /// Register (or replace) a provider
    pub fn with_provider(mut self, provider: Arc<dyn SettlementProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }
}

#[async_trait]
impl PaymentGateway for MobileMoneyGateway {
    fn normalize(&self, phone: &str) -> Result<String, GatewayError> {
        normalize(phone, &self.country_code)
    }

    fn route(&self, phone: &str) -> Result<ProviderId, GatewayError> {
        let normalized = self.normalize(phone)?;
        let national = normalized
            .strip_prefix(self.country_code.as_str())
            .unwrap_or(&normalized);
        Ok(self.routing.route(national))
    }

    async fn submit(&self, provider: ProviderId, mut request: SettlementRequest) -> SettlementResult {
        let Some(backend) = self.providers.get(&provider) else {
            return SettlementResult::failure(
                provider,
                format!("Unsupported payment provider: {provider}"),
            );
        };

        request.recipient_phone = match self.normalize(&request.recipient_phone) {
            Ok(phone) => phone,
            Err(e) => return SettlementResult::failure(provider, e.to_string()),
        };

        info!(
            %provider,
            phone = %request.recipient_phone,
            amount = %request.amount,
            reference = %request.transaction_reference,
            "initiating settlement"
        );

        let result = backend.submit(&request).await;
        if let SettlementResult::Failure { error, .. } = &result {
            warn!(%provider, reference = %request.transaction_reference, %error, "settlement refused");
        }
        result
    }

    async fn check_status(&self, provider: ProviderId, provider_reference: &str) -> StatusResult {
        match self.providers.get(&provider) {
            Some(backend) => backend.check_status(provider_reference).await,
            None => StatusResult::Unknown {
                error: format!("Unsupported payment provider: {provider}"),
            },
        }
    }
}
