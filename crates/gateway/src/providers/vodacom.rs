//! Vodacom M-Pesa (STK push)

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use super::{str_field, ProviderHttp, DESCRIPTION_PREFIX};
use crate::config::{GatewayConfig, MpesaCredentials};
use crate::provider::{
    ProviderId, SettlementProvider, SettlementRequest, SettlementResult, StatusResult,
};

const SUBMIT_PATH: &str = "/mpesa/stkpush/v1/processrequest";
const STATUS_PATH: &str = "/mpesa/stkpush/v1/status";

pub struct VodacomProvider {
    http: ProviderHttp,
    credentials: MpesaCredentials,
    callback_url: String,
}

impl VodacomProvider {
    pub fn new(client: Client, config: &GatewayConfig) -> Self {
        Self {
            http: ProviderHttp::new(ProviderId::Vodacom, client, config.vodacom.clone()),
            credentials: config.mpesa.clone(),
            callback_url: config.callback_url(ProviderId::Vodacom),
        }
    }

    fn payload(&self, request: &SettlementRequest) -> Value {
        json!({
            "BusinessShortCode": self.credentials.business_code,
            "Password": self.credentials.password,
            "Timestamp": Utc::now().format("%Y%m%d%H%M%S").to_string(),
            "TransactionType": "CustomerPayBillOnline",
            "Amount": request.amount.to_string(),
            "PartyA": self.credentials.paybill_number,
            "PartyB": request.recipient_phone,
            "PhoneNumber": request.recipient_phone,
            "CallBackURL": self.callback_url,
            "AccountReference": request.transaction_reference,
            "TransactionDesc": format!("{DESCRIPTION_PREFIX}: {}", request.purpose),
            "Initiator": request.initiator,
        })
    }
}

#[async_trait]
impl SettlementProvider for VodacomProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Vodacom
    }

    async fn submit(&self, request: &SettlementRequest) -> SettlementResult {
        if let Some(error) = self.http.disabled() {
            return SettlementResult::failure(ProviderId::Vodacom, error);
        }

        let body = match self.http.post(SUBMIT_PATH, &[], &self.payload(request)).await {
            Ok(body) => body,
            Err(error) => {
                warn!(reference = %request.transaction_reference, %error, "vodacom submission failed");
                return SettlementResult::failure(ProviderId::Vodacom, error);
            }
        };

        match (
            str_field(&body, "/ResponseCode").as_deref(),
            str_field(&body, "/CheckoutRequestID"),
        ) {
            (Some("0"), Some(reference)) => SettlementResult::Success {
                provider: ProviderId::Vodacom,
                provider_reference: reference,
                raw: body,
            },
            (Some("0"), None) => SettlementResult::failure(
                ProviderId::Vodacom,
                "Vodacom API response missing CheckoutRequestID",
            ),
            _ => SettlementResult::failure(
                ProviderId::Vodacom,
                str_field(&body, "/ResponseDescription")
                    .unwrap_or_else(|| "Vodacom API error".to_string()),
            ),
        }
    }

    async fn check_status(&self, provider_reference: &str) -> StatusResult {
        if let Some(error) = self.http.disabled() {
            return StatusResult::Unknown { error };
        }

        let path = format!("{STATUS_PATH}/{provider_reference}");
        let body = match self.http.get(&path, &[]).await {
            Ok(body) => body,
            Err(error) => return StatusResult::Unknown { error },
        };

        // No ResultCode yet means the customer has not completed the push
        match str_field(&body, "/ResultCode").as_deref() {
            None => StatusResult::Pending,
            Some("0") => StatusResult::Completed,
            Some(code) => StatusResult::Failed {
                reason: str_field(&body, "/ResultDesc")
                    .unwrap_or_else(|| format!("M-Pesa result code {code}")),
            },
        }
    }
}
