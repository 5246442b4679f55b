//! Core type definitions shared by connectors.
//!
//! Re-exports from alloy-primitives for Ethereum-compatible types.

use alloy::primitives::utils::{format_units, parse_units};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

pub use alloy::primitives::{Address, B256, U256};

/// Unique identifier for a token within a chain (contract address).
/// For the chain's native coin, use `Address::ZERO`.
pub type TokenId = Address;

/// Native coin identifier (zero address).
pub const NATIVE_TOKEN: TokenId = Address::ZERO;

/// Amount of tokens in the smallest unit (e.g. wei).
pub type Amount = U256;

/// Pattern accepted for slippage fractions such as `1/100`.
pub const PERCENT_PATTERN: &str = r"^(\d+)/(\d+)$";

static PERCENT_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(PERCENT_PATTERN).ok());

/// A token as known to a chain's token list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
}

impl Token {
    pub fn new(
        chain_id: u64,
        address: Address,
        decimals: u8,
        symbol: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            chain_id,
            address,
            decimals,
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    /// Whether this token stands for the chain's native coin.
    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN
    }

    /// Whether this token sorts before `other` (pair token0 ordering).
    pub fn sorts_before(&self, other: &Token) -> bool {
        self.address < other.address
    }

    /// Scale a human-readable amount (e.g. `"1.5"`) to the smallest unit.
    pub fn parse_amount(&self, amount: &str) -> Option<Amount> {
        parse_units(amount, self.decimals).ok().map(Into::into)
    }

    /// Render an amount in the smallest unit as a decimal string.
    pub fn format_amount(&self, amount: Amount) -> String {
        format_units(amount, self.decimals).unwrap_or_else(|_| amount.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// A percentage represented as a rational number (numerator/denominator).
/// `1/100` is one percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Percent {
    /// Numerator of the ratio.
    pub numerator: U256,
    /// Denominator of the ratio (must be non-zero).
    pub denominator: U256,
}

impl Percent {
    /// Create a new percent. Panics if denominator is zero.
    pub fn new(numerator: U256, denominator: U256) -> Self {
        assert!(!denominator.is_zero(), "percent denominator cannot be zero");
        Self {
            numerator,
            denominator,
        }
    }

    /// Create a percent from u128 values for convenience.
    pub fn from_u128(numerator: u128, denominator: u128) -> Self {
        Self::new(U256::from(numerator), U256::from(denominator))
    }

    /// Parse a fraction string of the form `n/d`.
    ///
    /// Returns `None` when the string does not match [`PERCENT_PATTERN`]
    /// or the denominator is zero.
    pub fn parse_fraction(s: &str) -> Option<Self> {
        let caps = PERCENT_REGEX.as_ref()?.captures(s.trim())?;
        let numerator: U256 = caps.get(1)?.as_str().parse().ok()?;
        let denominator: U256 = caps.get(2)?.as_str().parse().ok()?;
        if denominator.is_zero() {
            return None;
        }
        Some(Self {
            numerator,
            denominator,
        })
    }

    /// `amount * d / (d + n)`, rounded down.
    pub fn discount(&self, amount: Amount) -> Option<Amount> {
        amount
            .checked_mul(self.denominator)?
            .checked_div(self.denominator.checked_add(self.numerator)?)
    }

    /// `amount * (d + n) / d`, rounded down.
    pub fn markup(&self, amount: Amount) -> Option<Amount> {
        amount
            .checked_mul(self.denominator.checked_add(self.numerator)?)?
            .checked_div(self.denominator)
    }

    /// Convert to f64 for display purposes (may lose precision).
    pub fn to_f64(&self) -> f64 {
        let num: u128 = self.numerator.try_into().unwrap_or(u128::MAX);
        let den: u128 = self.denominator.try_into().unwrap_or(u128::MAX);
        num as f64 / den as f64
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
