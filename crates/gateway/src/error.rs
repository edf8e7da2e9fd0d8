//! Gateway errors
//!
//! Settlement failures are not errors: `submit` reports them as
//! `SettlementResult::Failure`. These cover configuration and input problems.

use thiserror::Error;

use crate::provider::ProviderId;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid phone number: '{0}'")]
    InvalidPhoneNumber(String),

    #[error("Unknown payment provider: {0}")]
    UnknownProvider(String),

    #[error("Routing prefix {prefix} for {second} overlaps {existing} of {first}")]
    OverlappingPrefix {
        prefix: String,
        existing: String,
        first: ProviderId,
        second: ProviderId,
    },

    #[error("Invalid routing table: {0}")]
    InvalidRoutingTable(String),

    #[error("Invalid gateway configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    pub fn is_overlap(&self) -> bool {
        matches!(self, GatewayError::OverlappingPrefix { .. })
    }
}
