//! DEX connectors for a trading gateway.
//!
//! This library provides:
//! - A catalog of the exchanges the gateway lists
//! - The `Uniswapish` connector interface and the Gamut connector on Kava
//! - A factory owning one connector instance per (chain, network)
//! - Constant-product pair math, best-trade search and router call encoding
//! - Chain providers with per-wallet nonce management

pub mod catalog;
pub mod chain;
pub mod config;
pub mod connector;
pub mod error;
pub mod factory;
pub mod fetcher;
pub mod gamut;
pub mod nonce;
pub mod pair;
pub mod router;
pub mod swap;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use catalog::{AvailableNetworks, Catalog, ConnectorDescriptor, ConnectorsResponse, TradingType};
pub use chain::{ChainProvider, ChainSet, EvmChain, SubmittedTransaction};
pub use config::{GamutConfig, GatewayConfig};
pub use connector::{ExecuteTradeParams, ExpectedTrade, Uniswapish};
pub use error::{ConnectorError, SdkError};
pub use factory::ConnectorFactory;
pub use gamut::Gamut;
pub use nonce::NonceManager;
pub use pair::Pair;
pub use router::{best_trade_exact_in, best_trade_exact_out, Route, RouteHop, Trade, TradeOptions, TradeType};
pub use swap::{swap_call_parameters, SwapOptions, SwapParameters};
pub use types::{Address, Amount, Percent, Token, TokenId, NATIVE_TOKEN, U256};
