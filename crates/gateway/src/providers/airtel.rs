//! Airtel Money

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use super::{str_field, ProviderHttp, DESCRIPTION_PREFIX};
use crate::config::GatewayConfig;
use crate::provider::{
    ProviderId, SettlementProvider, SettlementRequest, SettlementResult, StatusResult,
};

const SUBMIT_PATH: &str = "/merchant/v1/payments/";
const STATUS_PATH: &str = "/standard/v1/payments";

pub struct AirtelProvider {
    http: ProviderHttp,
    country: String,
    currency: String,
    callback_url: String,
}

impl AirtelProvider {
    pub fn new(client: Client, config: &GatewayConfig) -> Self {
        Self {
            http: ProviderHttp::new(ProviderId::Airtel, client, config.airtel.clone()),
            country: config.country_iso.clone(),
            currency: config.currency.clone(),
            callback_url: config.callback_url(ProviderId::Airtel),
        }
    }

    fn headers(&self) -> [(&str, &str); 2] {
        [
            ("X-Country", self.country.as_str()),
            ("X-Currency", self.currency.as_str()),
        ]
    }

    fn payload(&self, request: &SettlementRequest) -> Value {
        json!({
            "reference": request.transaction_reference,
            "subscriber": {
                "country": self.country,
                "currency": self.currency,
                "msisdn": request.recipient_phone,
            },
            "transaction": {
                "amount": request.amount.to_string(),
                "country": self.country,
                "currency": self.currency,
                "id": request.transaction_reference,
            },
            "description": format!("{DESCRIPTION_PREFIX}: {}", request.purpose),
            "callback_url": self.callback_url,
            "initiator": request.initiator,
        })
    }
}

#[async_trait]
impl SettlementProvider for AirtelProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Airtel
    }

    async fn submit(&self, request: &SettlementRequest) -> SettlementResult {
        if let Some(error) = self.http.disabled() {
            return SettlementResult::failure(ProviderId::Airtel, error);
        }

        let body = match self
            .http
            .post(SUBMIT_PATH, &self.headers(), &self.payload(request))
            .await
        {
            Ok(body) => body,
            Err(error) => {
                warn!(reference = %request.transaction_reference, %error, "airtel submission failed");
                return SettlementResult::failure(ProviderId::Airtel, error);
            }
        };

        match (
            str_field(&body, "/status/code").as_deref(),
            str_field(&body, "/data/transaction/id"),
        ) {
            (Some("200"), Some(reference)) => SettlementResult::Success {
                provider: ProviderId::Airtel,
                provider_reference: reference,
                raw: body,
            },
            (Some("200"), None) => SettlementResult::failure(
                ProviderId::Airtel,
                "Airtel API response missing transaction id",
            ),
            _ => SettlementResult::failure(
                ProviderId::Airtel,
                str_field(&body, "/status/message")
                    .unwrap_or_else(|| "Airtel API error".to_string()),
            ),
        }
    }

    async fn check_status(&self, provider_reference: &str) -> StatusResult {
        if let Some(error) = self.http.disabled() {
            return StatusResult::Unknown { error };
        }

        let path = format!("{STATUS_PATH}/{provider_reference}");
        let body = match self.http.get(&path, &self.headers()).await {
            Ok(body) => body,
            Err(error) => return StatusResult::Unknown { error },
        };

        // TS success, TF failed, TIP in progress, TA ambiguous
        match str_field(&body, "/data/transaction/status").as_deref() {
            Some("TS") => StatusResult::Completed,
            Some("TIP") | Some("TA") => StatusResult::Pending,
            Some("TF") => StatusResult::Failed {
                reason: str_field(&body, "/data/transaction/message")
                    .unwrap_or_else(|| "Airtel reported failure".to_string()),
            },
            other => StatusResult::Unknown {
                error: format!("unrecognized Airtel status {other:?}"),
            },
        }
    }
}
