//! Union Payments Gateway - Mobile-money settlement
//!
//! Routes an approved payment to one of several mobile-money providers by
//! the recipient's phone prefix and returns a uniform result.
//!
//! # Key Types
//! - `PaymentGateway`: The capability the orchestrator depends on
//! - `MobileMoneyGateway`: Real gateway over `SettlementProvider`s
//! - `RoutingTable`: Table-driven prefix routing, overlap-free
//! - `SettlementResult` / `StatusResult`: Uniform provider outcomes
//! - `MockGateway`: Scripted double with call counters

pub mod config;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod provider;
pub mod providers;
pub mod routing;

pub use config::{GatewayConfig, MpesaCredentials, ProviderSettings};
pub use error::GatewayError;
pub use gateway::{MobileMoneyGateway, PaymentGateway};
pub use mock::{MockBehavior, MockGateway};
pub use provider::{ProviderId, SettlementProvider, SettlementRequest, SettlementResult, StatusResult};
pub use providers::{AirtelProvider, TigoProvider, VodacomProvider};
pub use routing::{normalize, RoutingTable, DEFAULT_ROUTING_TABLE};
