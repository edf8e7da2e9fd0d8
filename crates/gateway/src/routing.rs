//! Phone number normalization and prefix routing

use std::collections::BTreeMap;

use crate::error::GatewayError;
use crate::provider::ProviderId;

/// Normalize a phone number to international digits.
///
/// Non-digits are stripped; a local leading `0` becomes the country code;
/// numbers without the country code get it prefixed.
pub fn normalize(phone: &str, country_code: &str) -> Result<String, GatewayError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() || digits.chars().all(|c| c == '0') {
        return Err(GatewayError::InvalidPhoneNumber(phone.to_string()));
    }

    if let Some(local) = digits.strip_prefix('0') {
        Ok(format!("{country_code}{local}"))
    } else if digits.starts_with(country_code) {
        Ok(digits)
    } else {
        Ok(format!("{country_code}{digits}"))
    }
}

/// Prefix table mapping national numbers to providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    /// prefix -> provider; no prefix is a prefix of another
    prefixes: BTreeMap<String, ProviderId>,
    default_provider: ProviderId,
}

impl RoutingTable {
    /// Build a table, rejecting overlapping prefixes.
    ///
    /// Two prefixes overlap when one starts with the other, e.g. `7` and
    /// `75`; such a table would route by accident of ordering.
    pub fn new<I, S>(entries: I, default_provider: ProviderId) -> Result<Self, GatewayError>
    where
        I: IntoIterator<Item = (ProviderId, S)>,
        S: Into<String>,
    {
        let mut prefixes: BTreeMap<String, ProviderId> = BTreeMap::new();

        for (provider, prefix) in entries {
            let prefix = prefix.into().trim().to_string();
            if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_digit()) {
                return Err(GatewayError::InvalidRoutingTable(format!(
                    "prefix '{prefix}' must be digits"
                )));
            }

            if let Some((existing, first)) = prefixes
                .iter()
                .find(|(p, _)| p.starts_with(&prefix) || prefix.starts_with(p.as_str()))
            {
                return Err(GatewayError::OverlappingPrefix {
                    prefix,
                    existing: existing.clone(),
                    first: *first,
                    second: provider,
                });
            }

            prefixes.insert(prefix, provider);
        }

        Ok(Self {
            prefixes,
            default_provider,
        })
    }

    /// Parse `vodacom=75,76,77;tigo=65,67,71;airtel=68,69,78`
    pub fn parse(table: &str, default_provider: ProviderId) -> Result<Self, GatewayError> {
        let mut entries = Vec::new();

        for group in table.split(';').map(str::trim).filter(|g| !g.is_empty()) {
            let (name, list) = group.split_once('=').ok_or_else(|| {
                GatewayError::InvalidRoutingTable(format!("expected provider=prefixes, got '{group}'"))
            })?;
            let provider = ProviderId::parse(name)?;
            for prefix in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                entries.push((provider, prefix.to_string()));
            }
        }

        Self::new(entries, default_provider)
    }

    /// Provider for a national number (country code already removed).
    /// Unmatched numbers go to the default provider.
    pub fn route(&self, national_number: &str) -> ProviderId {
        self.prefixes
            .iter()
            .find(|(prefix, _)| national_number.starts_with(prefix.as_str()))
            .map(|(_, provider)| *provider)
            .unwrap_or(self.default_provider)
    }

    pub fn default_provider(&self) -> ProviderId {
        self.default_provider
    }

    pub fn prefixes_for(&self, provider: ProviderId) -> Vec<&str> {
        self.prefixes
            .iter()
            .filter(|(_, p)| **p == provider)
            .map(|(prefix, _)| prefix.as_str())
            .collect()
    }
}

/// Default Tanzanian routing table
pub const DEFAULT_ROUTING_TABLE: &str = "vodacom=75,76,77;tigo=65,67,71;airtel=68,69,78";

impl Default for RoutingTable {
    fn default() -> Self {
        let entries = [
            (ProviderId::Vodacom, "75"),
            (ProviderId::Vodacom, "76"),
            (ProviderId::Vodacom, "77"),
            (ProviderId::Tigo, "65"),
            (ProviderId::Tigo, "67"),
            (ProviderId::Tigo, "71"),
            (ProviderId::Airtel, "68"),
            (ProviderId::Airtel, "69"),
            (ProviderId::Airtel, "78"),
        ];
        let prefixes = entries
            .into_iter()
            .map(|(provider, prefix)| (prefix.to_string(), provider))
            .collect();

        Self {
            prefixes,
            default_provider: ProviderId::Vodacom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("0754 123 456", "255").unwrap(), "255754123456");
        assert_eq!(normalize("+255-754-123-456", "255").unwrap(), "255754123456");
        assert_eq!(normalize("754123456", "255").unwrap(), "255754123456");
        assert!(matches!(
            normalize("n/a", "255"),
            Err(GatewayError::InvalidPhoneNumber(_))
        ));
        assert!(normalize("", "255").is_err());
    }

    #[test]
    fn test_default_table_routes() {
        let table = RoutingTable::default();
        assert_eq!(table.route("754123456"), ProviderId::Vodacom);
        assert_eq!(table.route("713123456"), ProviderId::Tigo);
        assert_eq!(table.route("683123456"), ProviderId::Airtel);
        assert_eq!(table.route("783123456"), ProviderId::Airtel);
        // Unmatched falls back
        assert_eq!(table.route("621123456"), ProviderId::Vodacom);
    }

    #[test]
    fn test_default_table_matches_parsed_constant() {
        let parsed = RoutingTable::parse(DEFAULT_ROUTING_TABLE, ProviderId::Vodacom).unwrap();
        assert_eq!(parsed, RoutingTable::default());
    }

    #[test]
    fn test_overlapping_prefixes_rejected() {
        let result = RoutingTable::parse("vodacom=75,78;airtel=68,78", ProviderId::Vodacom);
        match result {
            Err(GatewayError::OverlappingPrefix {
                prefix,
                first,
                second,
                ..
            }) => {
                assert_eq!(prefix, "78");
                assert_eq!(first, ProviderId::Vodacom);
                assert_eq!(second, ProviderId::Airtel);
            }
            other => panic!("expected overlap, got {other:?}"),
        }

        // Nested prefixes overlap too
        let nested = RoutingTable::parse("tigo=7;vodacom=75", ProviderId::Vodacom);
        assert!(matches!(nested, Err(ref e) if e.is_overlap()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            RoutingTable::parse("vodacom:75", ProviderId::Vodacom),
            Err(GatewayError::InvalidRoutingTable(_))
        ));
        assert!(matches!(
            RoutingTable::parse("vodacom=7a", ProviderId::Vodacom),
            Err(GatewayError::InvalidRoutingTable(_))
        ));
        assert!(matches!(
            RoutingTable::parse("halotel=62", ProviderId::Vodacom),
            Err(GatewayError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_prefixes_for() {
        let table = RoutingTable::default();
        assert_eq!(table.prefixes_for(ProviderId::Tigo), vec!["65", "67", "71"]);
    }
}
