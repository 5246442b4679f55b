//! Router call parameters for executing a trade.

use crate::error::{ConnectorError, SdkError};
use crate::router::{Trade, TradeType};
use crate::types::{Address, Percent, U256};
use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::JsonAbi;
use alloy::primitives::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON ABI of the Gamut router.
pub const GAMUT_ROUTER_ABI: &str = include_str!("../abi/gamut_router.json");

/// Parse the bundled router ABI.
pub fn gamut_router_abi() -> Result<JsonAbi, ConnectorError> {
    Ok(serde_json::from_str(GAMUT_ROUTER_ABI)?)
}

/// Options for building a swap call.
#[derive(Debug, Clone)]
pub struct SwapOptions {
    /// Seconds from now until the swap expires.
    pub ttl: u64,
    /// Receiver of the output tokens.
    pub recipient: Address,
    /// Slippage bound applied to the variable side of the trade.
    pub allowed_slippage: Percent,
}

/// A router method call: which method, its arguments and the native value
/// to attach.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapParameters {
    pub method_name: &'static str,
    pub args: Vec<DynSolValue>,
    pub value: U256,
}

impl SwapParameters {
    /// ABI-encode the call against the router ABI.
    pub fn encode(&self, abi: &JsonAbi) -> Result<Bytes, ConnectorError> {
        let function = abi
            .function(self.method_name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| SdkError::MissingMethod(self.method_name.to_string()))?;
        Ok(function.abi_encode_input(&self.args)?.into())
    }
}

/// Build router call parameters for `trade`, expiring `ttl` seconds from now.
pub fn swap_call_parameters(
    trade: &Trade,
    options: &SwapOptions,
) -> Result<SwapParameters, SdkError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    swap_call_parameters_at(trade, options, now)
}

/// Build router call parameters for `trade` with the deadline counted from
/// `now` (unix seconds).
pub fn swap_call_parameters_at(
    trade: &Trade,
    options: &SwapOptions,
    now: u64,
) -> Result<SwapParameters, SdkError> {
    if trade.native_in && trade.native_out {
        return Err(SdkError::NativeInOut);
    }
    if options.ttl == 0 {
        return Err(SdkError::InvalidTtl);
    }

    let amount_in = trade.maximum_amount_in(&options.allowed_slippage)?;
    let amount_out = trade.minimum_amount_out(&options.allowed_slippage)?;
    let path = DynSolValue::Array(
        trade
            .route
            .path()
            .into_iter()
            .map(DynSolValue::Address)
            .collect(),
    );
    let to = DynSolValue::Address(options.recipient);
    let deadline = uint(U256::from(now.saturating_add(options.ttl)));

    let (method_name, args, value) = match (trade.trade_type, trade.native_in, trade.native_out) {
        (TradeType::ExactInput, true, _) => (
            "swapExactETHForTokens",
            vec![uint(amount_out), path, to, deadline],
            amount_in,
        ),
        (TradeType::ExactInput, _, true) => (
            "swapExactTokensForETH",
            vec![uint(amount_in), uint(amount_out), path, to, deadline],
            U256::ZERO,
        ),
        (TradeType::ExactInput, false, false) => (
            "swapExactTokensForTokens",
            vec![uint(amount_in), uint(amount_out), path, to, deadline],
            U256::ZERO,
        ),
        (TradeType::ExactOutput, true, _) => (
            "swapETHForExactTokens",
            vec![uint(amount_out), path, to, deadline],
            amount_in,
        ),
        (TradeType::ExactOutput, _, true) => (
            "swapTokensForExactETH",
            vec![uint(amount_out), uint(amount_in), path, to, deadline],
            U256::ZERO,
        ),
        (TradeType::ExactOutput, false, false) => (
            "swapTokensForExactTokens",
            vec![uint(amount_out), uint(amount_in), path, to, deadline],
            U256::ZERO,
        ),
    };

    Ok(SwapParameters {
        method_name,
        args,
        value,
    })
}

fn uint(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}
