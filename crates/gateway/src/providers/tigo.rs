//! Tigo Pesa

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use super::{str_field, ProviderHttp, DESCRIPTION_PREFIX};
use crate::config::GatewayConfig;
use crate::provider::{
    ProviderId, SettlementProvider, SettlementRequest, SettlementResult, StatusResult,
};

const SUBMIT_PATH: &str = "/v1/payments/request";

pub struct TigoProvider {
    http: ProviderHttp,
    callback_url: String,
}

impl TigoProvider {
    pub fn new(client: Client, config: &GatewayConfig) -> Self {
        Self {
            http: ProviderHttp::new(ProviderId::Tigo, client, config.tigo.clone()),
            callback_url: config.callback_url(ProviderId::Tigo),
        }
    }

    fn payload(&self, request: &SettlementRequest) -> Value {
        json!({
            "amount": request.amount.to_string(),
            "phone": request.recipient_phone,
            "reference": request.transaction_reference,
            "description": format!("{DESCRIPTION_PREFIX}: {}", request.purpose),
            "callback_url": self.callback_url,
            "initiator": request.initiator,
        })
    }
}

#[async_trait]
impl SettlementProvider for TigoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Tigo
    }

    async fn submit(&self, request: &SettlementRequest) -> SettlementResult {
        if let Some(error) = self.http.disabled() {
            return SettlementResult::failure(ProviderId::Tigo, error);
        }

        let body = match self.http.post(SUBMIT_PATH, &[], &self.payload(request)).await {
            Ok(body) => body,
            Err(error) => {
                warn!(reference = %request.transaction_reference, %error, "tigo submission failed");
                return SettlementResult::failure(ProviderId::Tigo, error);
            }
        };

        let succeeded = body.get("status").and_then(Value::as_str) == Some("success");
        match (succeeded, str_field(&body, "/transaction_id")) {
            (true, Some(reference)) => SettlementResult::Success {
                provider: ProviderId::Tigo,
                provider_reference: reference,
                raw: body,
            },
            (true, None) => SettlementResult::failure(
                ProviderId::Tigo,
                "Tigo API response missing transaction_id",
            ),
            (false, _) => SettlementResult::failure(
                ProviderId::Tigo,
                str_field(&body, "/message").unwrap_or_else(|| "Tigo API error".to_string()),
            ),
        }
    }

    async fn check_status(&self, provider_reference: &str) -> StatusResult {
        if let Some(error) = self.http.disabled() {
            return StatusResult::Unknown { error };
        }

        let path = format!("/v1/payments/{provider_reference}/status");
        let body = match self.http.get(&path, &[]).await {
            Ok(body) => body,
            Err(error) => return StatusResult::Unknown { error },
        };

        match body.get("status").and_then(Value::as_str) {
            Some("success" | "completed") => StatusResult::Completed,
            Some("pending" | "processing") => StatusResult::Pending,
            Some("failed" | "cancelled") => StatusResult::Failed {
                reason: str_field(&body, "/message")
                    .unwrap_or_else(|| "Tigo reported failure".to_string()),
            },
            other => StatusResult::Unknown {
                error: format!("unrecognized Tigo status {other:?}"),
            },
        }
    }
}
