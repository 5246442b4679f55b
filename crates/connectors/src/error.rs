//! Error types surfaced by connectors.

use crate::types::Address;
use thiserror::Error;

/// Errors a connector operation can surface to the gateway layer.
///
/// Provider and ABI failures are passed through untouched; only `Config` and
/// `Price` originate in the connectors themselves.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Malformed or missing configuration (e.g. an unparseable slippage).
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Load(#[from] Box<figment::Error>),

    /// No trade path exists for the requested pair. Retry with different
    /// parameters or abort.
    #[error("price error: {0}")]
    Price(String),

    /// Pair math, routing or call-parameter failure.
    #[error("sdk error: {0}")]
    Sdk(#[from] SdkError),

    /// RPC transport failure (network error, reverted call, rejected tx).
    #[error(transparent)]
    Transport(#[from] alloy::transports::TransportError),

    /// A transaction could not be signed locally.
    #[error("signer error: {0}")]
    Signer(#[from] alloy::network::TransactionBuilderError<alloy::network::Ethereum>),

    /// Return data could not be decoded.
    #[error("abi decode error: {0}")]
    Decode(#[from] alloy::sol_types::Error),

    /// Router call could not be encoded against the supplied ABI.
    #[error("abi encode error: {0}")]
    Abi(#[from] alloy::dyn_abi::Error),

    /// A bundled JSON ABI could not be parsed.
    #[error("abi json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for ConnectorError {
    fn from(err: figment::Error) -> Self {
        ConnectorError::Load(Box::new(err))
    }
}

impl ConnectorError {
    /// Whether this is the distinguished "no trade path" error.
    pub fn is_price_error(&self) -> bool {
        matches!(self, ConnectorError::Price(_))
    }
}

/// Errors raised by the trading SDK (pair math, trade search, call building).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// A pair has no reserves, or the requested output drains them.
    InsufficientReserves,
    /// The input is too small to produce any output.
    InsufficientInputAmount,
    /// The token is not part of the pair.
    UnknownToken(Address),
    /// A trade was built from an empty or disconnected route.
    InvalidRoute,
    /// Both sides of a swap are the native coin.
    NativeInOut,
    /// A swap deadline needs a positive ttl.
    InvalidTtl,
    /// The router ABI has no function with this name.
    MissingMethod(String),
    /// Arithmetic overflow while applying slippage.
    Overflow,
}

impl std::fmt::Display for SdkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SdkError::InsufficientReserves => write!(f, "insufficient reserves"),
            SdkError::InsufficientInputAmount => write!(f, "insufficient input amount"),
            SdkError::UnknownToken(token) => write!(f, "token {} not in pair", token),
            SdkError::InvalidRoute => write!(f, "invalid route"),
            SdkError::NativeInOut => write!(f, "native coin on both sides of swap"),
            SdkError::InvalidTtl => write!(f, "ttl must be positive"),
            SdkError::MissingMethod(name) => write!(f, "router abi has no method {}", name),
            SdkError::Overflow => write!(f, "arithmetic overflow"),
        }
    }
}

impl std::error::Error for SdkError {}

impl SdkError {
    /// Liquidity errors make a route unusable but are not failures of the
    /// search itself.
    pub fn is_insufficient_liquidity(&self) -> bool {
        matches!(
            self,
            SdkError::InsufficientReserves | SdkError::InsufficientInputAmount
        )
    }
}
