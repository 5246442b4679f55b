//! The capability set shared by constant-product exchange connectors.

use crate::chain::SubmittedTransaction;
use crate::error::ConnectorError;
use crate::router::Trade;
use crate::types::{Address, Amount, Percent, Token};
use alloy::json_abi::JsonAbi;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;

/// A priced trade and its slippage-bounded counter-amount.
///
/// For a sell this is the least output accepted, for a buy the most input
/// spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedTrade {
    pub trade: Trade,
    pub expected_amount: Amount,
}

/// Transaction settings for `execute_trade`.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteTradeParams<'a> {
    /// Legacy gas price in gwei. Ignored when a fee-market field is set.
    pub gas_price: f64,
    pub router: Address,
    /// Seconds until the swap expires.
    pub ttl: u64,
    pub abi: &'a JsonAbi,
    pub gas_limit: u64,
    pub nonce: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    /// Slippage override such as `1/100`.
    pub allowed_slippage: Option<&'a str>,
}

impl ExecuteTradeParams<'_> {
    /// Whether the transaction is priced with EIP-1559 fields.
    pub fn is_fee_market(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }

    /// Legacy gas price in wei.
    pub fn gas_price_wei(&self) -> u128 {
        (self.gas_price * 1e9).round() as u128
    }
}

/// An exchange quoting and executing swaps through a Uniswap V2 style router.
#[async_trait]
pub trait Uniswapish: Send + Sync {
    /// Initialize the chain if needed and load the token map.
    async fn init(&self) -> Result<(), ConnectorError>;

    /// Whether `init` has completed.
    fn ready(&self) -> bool;

    /// Look up a token of the loaded token map.
    fn get_token_by_address(&self, address: Address) -> Option<Token>;

    /// Router contract address.
    fn router(&self) -> Address;

    /// Router contract ABI.
    fn router_abi(&self) -> &JsonAbi;

    /// Default gas limit for swap transactions.
    fn gas_limit_estimate(&self) -> u64;

    /// Default time-to-live for swap transactions, in seconds.
    fn ttl(&self) -> u64;

    /// The slippage to apply: `allowed_slippage` when it is a valid fraction,
    /// else the configured default.
    fn get_allowed_slippage(&self, allowed_slippage: Option<&str>)
        -> Result<Percent, ConnectorError>;

    /// Price selling exactly `amount` of `base` for `quote`.
    async fn estimate_sell_trade(
        &self,
        base: &Token,
        quote: &Token,
        amount: Amount,
        allowed_slippage: Option<&str>,
    ) -> Result<ExpectedTrade, ConnectorError>;

    /// Price buying exactly `amount` of `base` with `quote`.
    async fn estimate_buy_trade(
        &self,
        quote: &Token,
        base: &Token,
        amount: Amount,
        allowed_slippage: Option<&str>,
    ) -> Result<ExpectedTrade, ConnectorError>;

    /// Submit `trade` through the router from `wallet`.
    async fn execute_trade(
        &self,
        wallet: &PrivateKeySigner,
        trade: &Trade,
        params: ExecuteTradeParams<'_>,
    ) -> Result<SubmittedTransaction, ConnectorError>;
}

/// Resolve a slippage override against a configured default.
///
/// A malformed override falls back to the default; a malformed default is a
/// configuration error.
pub fn resolve_allowed_slippage(
    allowed_slippage: Option<&str>,
    default: &str,
) -> Result<Percent, ConnectorError> {
    if let Some(percent) = allowed_slippage.and_then(Percent::parse_fraction) {
        return Ok(percent);
    }
    Percent::parse_fraction(default).ok_or_else(|| {
        ConnectorError::Config(format!(
            "malformed percent string {:?} in the config for allowed_slippage",
            default
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_takes_precedence() {
        let percent = resolve_allowed_slippage(Some("3/200"), "1/100").unwrap();
        assert_eq!(percent, Percent::from_u128(3, 200));
    }

    #[test]
    fn test_falls_back_to_default() {
        assert_eq!(
            resolve_allowed_slippage(None, "1/100").unwrap(),
            Percent::from_u128(1, 100)
        );
        assert_eq!(
            resolve_allowed_slippage(Some("0.5%"), " 2/100 ").unwrap(),
            Percent::from_u128(2, 100)
        );
    }

    #[test]
    fn test_malformed_default() {
        assert!(matches!(
            resolve_allowed_slippage(None, "1%"),
            Err(ConnectorError::Config(_))
        ));
        assert!(matches!(
            resolve_allowed_slippage(Some("abc"), "1/0"),
            Err(ConnectorError::Config(_))
        ));
        // A valid override never consults the default
        assert!(resolve_allowed_slippage(Some("1/2"), "bad").is_ok());
    }

    #[test]
    fn test_gas_price_wei() {
        let abi = JsonAbi::default();
        let params = ExecuteTradeParams {
            gas_price: 1.5,
            router: Address::ZERO,
            ttl: 300,
            abi: &abi,
            gas_limit: 300_000,
            nonce: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            allowed_slippage: None,
        };
        assert_eq!(params.gas_price_wei(), 1_500_000_000);
        assert!(!params.is_fee_market());

        let params = ExecuteTradeParams {
            max_priority_fee_per_gas: Some(1),
            ..params
        };
        assert!(params.is_fee_market());
    }
}
