//! Concrete mobile-money providers
//!
//! Each provider performs one outbound call per operation and maps its own
//! response codes onto `SettlementResult` / `StatusResult`.

mod airtel;
mod tigo;
mod vodacom;

pub use airtel::AirtelProvider;
pub use tigo::TigoProvider;
pub use vodacom::VodacomProvider;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::error::GatewayError;
use crate::provider::ProviderId;

/// Build the HTTP client shared by all providers
pub fn build_http_client(timeout: Duration) -> Result<Client, GatewayError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Prefix on the transaction description sent to providers
pub(crate) const DESCRIPTION_PREFIX: &str = "Union payment";

/// HTTP plumbing common to every provider
#[derive(Debug, Clone)]
pub(crate) struct ProviderHttp {
    id: ProviderId,
    client: Client,
    settings: ProviderSettings,
}

impl ProviderHttp {
    pub(crate) fn new(id: ProviderId, client: Client, settings: ProviderSettings) -> Self {
        Self {
            id,
            client,
            settings,
        }
    }

    /// Failure text when the provider is switched off
    pub(crate) fn disabled(&self) -> Option<String> {
        (!self.settings.enabled)
            .then(|| format!("{} payment provider is disabled", self.id.display_name()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
        let builder = match &self.settings.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        };
        headers
            .iter()
            .fold(builder, |b, (name, value)| b.header(*name, *value))
    }

    pub(crate) async fn post(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, String> {
        let url = self.url(path);
        debug!(provider = %self.id, %url, "provider request");
        let request = self.authorize(self.client.post(&url), headers).json(body);
        self.send(request).await
    }

    pub(crate) async fn get(&self, path: &str, headers: &[(&str, &str)]) -> Result<Value, String> {
        let url = self.url(path);
        debug!(provider = %self.id, %url, "provider status query");
        let request = self.authorize(self.client.get(&url), headers);
        self.send(request).await
    }

    /// Transport, HTTP status and decoding errors all become a message
    async fn send(&self, request: RequestBuilder) -> Result<Value, String> {
        let name = self.id.display_name();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                format!("{name} API request timed out")
            } else {
                format!("{name} API request failed: {e}")
            }
        })?;

        let status = response.status();
        let body: Option<Value> = response.json().await.ok();

        if !status.is_success() {
            let detail = body
                .as_ref()
                .and_then(extract_message)
                .map(|m| format!(": {m}"))
                .unwrap_or_default();
            return Err(format!("{name} API returned HTTP {}{detail}", status.as_u16()));
        }

        body.ok_or_else(|| format!("{name} API returned an unreadable response"))
    }
}

/// Best-effort human message from an error body
fn extract_message(body: &Value) -> Option<String> {
    ["message", "ResponseDescription", "errorMessage"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .or_else(|| body.pointer("/status/message").and_then(Value::as_str))
        .map(str::to_string)
}

/// String field that providers send either as a string or a number
pub(crate) fn str_field(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
