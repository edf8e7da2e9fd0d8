//! Gateway configuration
//!
//! Every setting has a default and can be overridden through the
//! environment (`VODACOM_*`, `TIGO_*`, `AIRTEL_*`, `ROUTING_TABLE`, ...).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GatewayError;
use crate::provider::ProviderId;
use crate::routing::{RoutingTable, DEFAULT_ROUTING_TABLE};

/// Connection settings for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Disabled providers fail every submission without a network call
    #[serde(default)]
    pub enabled: bool,
}

impl ProviderSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            enabled: false,
        }
    }

    pub fn enabled(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self.enabled = true;
        self
    }
}

/// M-Pesa STK push credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpesaCredentials {
    #[serde(default)]
    pub business_code: String,
    #[serde(default)]
    pub password: String,
    /// Organization paybill the funds are drawn from
    #[serde(default)]
    pub paybill_number: String,
}

/// Configuration for the mobile-money gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Dialing code used by phone normalization
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// ISO country sent to Airtel
    #[serde(default = "default_country_iso")]
    pub country_iso: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Per-call timeout for provider requests
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Base URL providers call back to
    #[serde(default = "default_callback_base_url")]
    pub callback_base_url: String,

    /// Provider for numbers no prefix matches
    #[serde(default)]
    pub default_provider: ProviderId,

    /// `provider=prefix,prefix;...`
    #[serde(default = "default_routing_table")]
    pub routing_table: String,

    #[serde(default = "default_vodacom")]
    pub vodacom: ProviderSettings,

    #[serde(default = "default_tigo")]
    pub tigo: ProviderSettings,

    #[serde(default = "default_airtel")]
    pub airtel: ProviderSettings,

    #[serde(default)]
    pub mpesa: MpesaCredentials,
}

fn default_country_code() -> String {
    "255".to_string()
}

fn default_country_iso() -> String {
    "TZ".to_string()
}

fn default_currency() -> String {
    "TZS".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_callback_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_routing_table() -> String {
    DEFAULT_ROUTING_TABLE.to_string()
}

fn default_vodacom() -> ProviderSettings {
    ProviderSettings::new("https://api.vodacom.co.tz")
}

fn default_tigo() -> ProviderSettings {
    ProviderSettings::new("https://api.tigo.co.tz")
}

fn default_airtel() -> ProviderSettings {
    ProviderSettings::new("https://api.airtel.co.tz")
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            country_iso: default_country_iso(),
            currency: default_currency(),
            timeout_secs: default_timeout_secs(),
            callback_base_url: default_callback_base_url(),
            default_provider: ProviderId::default(),
            routing_table: default_routing_table(),
            vodacom: default_vodacom(),
            tigo: default_tigo(),
            airtel: default_airtel(),
            mpesa: MpesaCredentials::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("PHONE_COUNTRY_CODE") {
            config.country_code = v;
        }
        if let Some(v) = lookup("PROVIDER_COUNTRY") {
            config.country_iso = v;
        }
        if let Some(v) = lookup("PROVIDER_CURRENCY") {
            config.currency = v;
        }
        if let Some(v) = lookup("PROVIDER_TIMEOUT_SECS") {
            config.timeout_secs = v.trim().parse().map_err(|_| {
                GatewayError::InvalidConfig(format!("PROVIDER_TIMEOUT_SECS is not a number: '{v}'"))
            })?;
        }
        if let Some(v) = lookup("BASE_URL") {
            config.callback_base_url = v;
        }
        if let Some(v) = lookup("DEFAULT_PROVIDER") {
            config.default_provider = ProviderId::parse(&v)?;
        }
        if let Some(v) = lookup("ROUTING_TABLE") {
            config.routing_table = v;
        }

        apply_provider_env(&lookup, "VODACOM", &mut config.vodacom);
        apply_provider_env(&lookup, "TIGO", &mut config.tigo);
        apply_provider_env(&lookup, "AIRTEL", &mut config.airtel);

        if let Some(v) = lookup("VODACOM_BUSINESS_CODE") {
            config.mpesa.business_code = v;
        }
        if let Some(v) = lookup("VODACOM_PASSWORD") {
            config.mpesa.password = v;
        }
        if let Some(v) = lookup("VODACOM_PAYBILL_NUMBER") {
            config.mpesa.paybill_number = v;
        }

        // Fail at startup rather than on the first settlement
        config.validate()?;

        Ok(config)
    }

    /// Check the settings that would otherwise fail every settlement
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "provider timeout must be at least one second".to_string(),
            ));
        }
        self.routing()?;
        Ok(())
    }

    /// Build the routing table
    pub fn routing(&self) -> Result<RoutingTable, GatewayError> {
        RoutingTable::parse(&self.routing_table, self.default_provider)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn provider(&self, id: ProviderId) -> &ProviderSettings {
        match id {
            ProviderId::Vodacom => &self.vodacom,
            ProviderId::Tigo => &self.tigo,
            ProviderId::Airtel => &self.airtel,
        }
    }

    /// Callback URL a provider reports completion to
    pub fn callback_url(&self, id: ProviderId) -> String {
        format!(
            "{}/api/payments/{}/callback",
            self.callback_base_url.trim_end_matches('/'),
            id.as_str()
        )
    }
}

fn apply_provider_env<F>(lookup: &F, prefix: &str, settings: &mut ProviderSettings)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(&format!("{prefix}_API_URL")) {
        settings.base_url = v;
    }
    if let Some(v) = lookup(&format!("{prefix}_API_KEY")) {
        settings.api_key = Some(v);
    }
    if let Some(v) = lookup(&format!("{prefix}_ENABLED")) {
        settings.enabled = v.eq_ignore_ascii_case("true");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.country_code, "255");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.vodacom.enabled);
        assert_eq!(config.routing().unwrap(), RoutingTable::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("TIGO_API_URL", "http://tigo.test"),
            ("TIGO_API_KEY", "secret"),
            ("TIGO_ENABLED", "true"),
            ("PROVIDER_TIMEOUT_SECS", "5"),
            ("DEFAULT_PROVIDER", "airtel"),
            ("BASE_URL", "https://union.example/"),
        ]))
        .unwrap();

        assert_eq!(config.tigo.base_url, "http://tigo.test");
        assert_eq!(config.tigo.api_key.as_deref(), Some("secret"));
        assert!(config.tigo.enabled);
        assert!(!config.airtel.enabled);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.routing().unwrap().default_provider(), ProviderId::Airtel);
        assert_eq!(
            config.callback_url(ProviderId::Tigo),
            "https://union.example/api/payments/tigo/callback"
        );
    }

    #[test]
    fn test_overlapping_routing_env_rejected() {
        let result = GatewayConfig::from_lookup(lookup_from(&[(
            "ROUTING_TABLE",
            "vodacom=75,76,77,78;tigo=65,67,71;airtel=68,69,78",
        )]));
        assert!(matches!(result, Err(ref e) if e.is_overlap()));
    }

    #[test]
    fn test_bad_timeout_rejected() {
        for value in ["thirty", "0", "-5"] {
            let result =
                GatewayConfig::from_lookup(lookup_from(&[("PROVIDER_TIMEOUT_SECS", value)]));
            assert!(
                matches!(result, Err(GatewayError::InvalidConfig(_))),
                "{value}: {result:?}"
            );
        }

        let config = GatewayConfig {
            timeout_secs: 0,
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"timeout_secs": 10, "airtel": {"base_url": "http://a"}}"#)
                .unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.airtel.base_url, "http://a");
        assert_eq!(config.currency, "TZS");
    }
}
