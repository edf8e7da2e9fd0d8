//! Provider identity, settlement request/result types and the provider trait

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::GatewayError;

/// Supported mobile-money providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Vodacom M-Pesa
    #[default]
    Vodacom,
    /// Tigo Pesa
    Tigo,
    /// Airtel Money
    Airtel,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::Vodacom, ProviderId::Tigo, ProviderId::Airtel];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Vodacom => "vodacom",
            ProviderId::Tigo => "tigo",
            ProviderId::Airtel => "airtel",
        }
    }

    /// Human-readable name used in failure messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::Vodacom => "Vodacom",
            ProviderId::Tigo => "Tigo",
            ProviderId::Airtel => "Airtel",
        }
    }

    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vodacom" | "mpesa" => Ok(ProviderId::Vodacom),
            "tigo" => Ok(ProviderId::Tigo),
            "airtel" => Ok(ProviderId::Airtel),
            other => Err(GatewayError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single settlement instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub amount: Decimal,
    pub recipient_phone: String,
    pub recipient_name: String,
    pub purpose: String,
    /// Internal reference, sent to the provider for idempotency
    pub transaction_reference: String,
    /// User id of the approving signatory
    pub initiator: String,
}

/// Uniform outcome of a settlement submission
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementResult {
    Success {
        provider: ProviderId,
        provider_reference: String,
        raw: Value,
    },
    Failure {
        provider: ProviderId,
        error: String,
    },
}

impl SettlementResult {
    pub fn failure(provider: ProviderId, error: impl Into<String>) -> Self {
        SettlementResult::Failure {
            provider,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SettlementResult::Success { .. })
    }

    pub fn provider(&self) -> ProviderId {
        match self {
            SettlementResult::Success { provider, .. } | SettlementResult::Failure { provider, .. } => {
                *provider
            }
        }
    }
}

/// Provider-reported state of a submitted settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusResult {
    Pending,
    Completed,
    Failed { reason: String },
    /// The query itself failed or the answer was not understood
    Unknown { error: String },
}

/// One concrete settlement backend
#[async_trait]
pub trait SettlementProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Submit one settlement. Never fails: transport and provider errors
    /// come back as `SettlementResult::Failure`.
    async fn submit(&self, request: &SettlementRequest) -> SettlementResult;

    /// Best-effort status query for an earlier submission
    async fn check_status(&self, provider_reference: &str) -> StatusResult;
}
