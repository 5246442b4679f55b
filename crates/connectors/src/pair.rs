//! Constant-product liquidity pairs.

use crate::error::SdkError;
use crate::types::{Amount, Token, TokenId, U256};
use alloy::primitives::{keccak256, Address};
use std::fmt;

/// Basis-point denominator for swap fees.
pub const FEE_DENOMINATOR_BPS: u32 = 10_000;

/// Unique identifier for a pair.
/// This is deterministically generated from the two token IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairId(pub [u8; 32]);

impl PairId {
    /// Create a PairId from two tokens.
    /// The pair ID is the same regardless of token order.
    pub fn from_tokens(token_a: TokenId, token_b: TokenId) -> Self {
        Self(pair_salt(token_a, token_b).0)
    }
}

/// `keccak256(token0 ++ token1)` with the tokens sorted, as used for CREATE2
/// pair addresses.
pub fn pair_salt(token_a: TokenId, token_b: TokenId) -> alloy::primitives::B256 {
    let (first, second) = if token_a <= token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };

    let mut data = [0u8; 40];
    data[..20].copy_from_slice(first.as_slice());
    data[20..].copy_from_slice(second.as_slice());
    keccak256(data)
}

/// A liquidity pool holding reserves of two tokens.
///
/// Tokens are kept sorted by address: `token0` is always the lower address,
/// matching the on-chain `getReserves` ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    /// Address of the pair contract.
    pub address: Address,
    token0: Token,
    token1: Token,
    reserve0: Amount,
    reserve1: Amount,
    /// Swap fee in basis points (25 = 0.25%).
    fee_bps: u32,
}

impl Pair {
    /// Create a new pair. The tokens may be given in either order.
    pub fn new(
        address: Address,
        (token_a, reserve_a): (Token, Amount),
        (token_b, reserve_b): (Token, Amount),
        fee_bps: u32,
    ) -> Self {
        let ((token0, reserve0), (token1, reserve1)) = if token_a.sorts_before(&token_b) {
            ((token_a, reserve_a), (token_b, reserve_b))
        } else {
            ((token_b, reserve_b), (token_a, reserve_a))
        };
        Self {
            address,
            token0,
            token1,
            reserve0,
            reserve1,
            fee_bps,
        }
    }

    /// Get the pair ID.
    pub fn id(&self) -> PairId {
        PairId::from_tokens(self.token0.address, self.token1.address)
    }

    pub fn token0(&self) -> &Token {
        &self.token0
    }

    pub fn token1(&self) -> &Token {
        &self.token1
    }

    pub fn reserve0(&self) -> Amount {
        self.reserve0
    }

    pub fn reserve1(&self) -> Amount {
        self.reserve1
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    /// Check if this pair contains the given token.
    pub fn involves_token(&self, token: TokenId) -> bool {
        self.token0.address == token || self.token1.address == token
    }

    /// Get one of the pair's tokens by address.
    pub fn token(&self, token: TokenId) -> Option<&Token> {
        if self.token0.address == token {
            Some(&self.token0)
        } else if self.token1.address == token {
            Some(&self.token1)
        } else {
            None
        }
    }

    /// Get the other token in the pair.
    pub fn other_token(&self, token: TokenId) -> Option<&Token> {
        if self.token0.address == token {
            Some(&self.token1)
        } else if self.token1.address == token {
            Some(&self.token0)
        } else {
            None
        }
    }

    /// Reserve of the given token.
    pub fn reserve_of(&self, token: TokenId) -> Option<Amount> {
        if self.token0.address == token {
            Some(self.reserve0)
        } else if self.token1.address == token {
            Some(self.reserve1)
        } else {
            None
        }
    }

    fn reserves_for(&self, token_in: TokenId) -> Result<(Amount, Amount), SdkError> {
        let reserve_in = self
            .reserve_of(token_in)
            .ok_or(SdkError::UnknownToken(token_in))?;
        let reserve_out = if self.token0.address == token_in {
            self.reserve1
        } else {
            self.reserve0
        };
        Ok((reserve_in, reserve_out))
    }

    /// Output received for `amount_in` of `token_in`, after fees.
    ///
    /// `out = in_with_fee * reserve_out / (reserve_in * 10000 + in_with_fee)`
    /// where `in_with_fee = in * (10000 - fee_bps)`.
    pub fn output_amount(&self, token_in: TokenId, amount_in: Amount) -> Result<Amount, SdkError> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in)?;
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(SdkError::InsufficientReserves);
        }

        let amount_in_with_fee = amount_in
            .checked_mul(U256::from(FEE_DENOMINATOR_BPS - self.fee_bps))
            .ok_or(SdkError::Overflow)?;
        let numerator = amount_in_with_fee
            .checked_mul(reserve_out)
            .ok_or(SdkError::Overflow)?;
        let denominator = reserve_in
            .checked_mul(U256::from(FEE_DENOMINATOR_BPS))
            .and_then(|r| r.checked_add(amount_in_with_fee))
            .ok_or(SdkError::Overflow)?;

        let amount_out = numerator / denominator;
        if amount_out.is_zero() {
            return Err(SdkError::InsufficientInputAmount);
        }
        Ok(amount_out)
    }

    /// Input of the other token needed to receive `amount_out` of `token_out`.
    ///
    /// `in = reserve_in * out * 10000 / ((reserve_out - out) * (10000 - fee_bps)) + 1`
    pub fn input_amount(&self, token_out: TokenId, amount_out: Amount) -> Result<Amount, SdkError> {
        let (reserve_out, reserve_in) = self.reserves_for(token_out)?;
        if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
            return Err(SdkError::InsufficientReserves);
        }

        let numerator = reserve_in
            .checked_mul(amount_out)
            .and_then(|n| n.checked_mul(U256::from(FEE_DENOMINATOR_BPS)))
            .ok_or(SdkError::Overflow)?;
        let denominator = (reserve_out - amount_out)
            .checked_mul(U256::from(FEE_DENOMINATOR_BPS - self.fee_bps))
            .ok_or(SdkError::Overflow)?;

        Ok(numerator / denominator + U256::from(1))
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} @ {}",
            self.token0.symbol, self.token1.symbol, self.address
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busd() -> Token {
        Token::new(2222, Address::repeat_byte(0x33), 18, "BUSD", "BUSD Coin")
    }

    fn wkava() -> Token {
        Token::new(2222, Address::repeat_byte(0xc8), 18, "WKAVA", "Wrapped KAVA")
    }

    fn dai() -> Token {
        Token::new(2222, Address::repeat_byte(0x76), 18, "DAI", "Dai")
    }

    fn pair(reserve_busd: u64, reserve_wkava: u64) -> Pair {
        Pair::new(
            Address::repeat_byte(0xee),
            (wkava(), U256::from(reserve_wkava)),
            (busd(), U256::from(reserve_busd)),
            25,
        )
    }

    #[test]
    fn test_pair_id_deterministic() {
        let a = busd().address;
        let b = wkava().address;

        // Same underlying pair ID regardless of order
        assert_eq!(PairId::from_tokens(a, b), PairId::from_tokens(b, a));
        assert_eq!(pair(1, 1).id(), PairId::from_tokens(b, a));
    }

    #[test]
    fn test_tokens_sorted() {
        let pair = pair(1_000, 2_000);

        // BUSD (0x33..) sorts before WKAVA (0xc8..)
        assert_eq!(pair.token0().symbol, "BUSD");
        assert_eq!(pair.token1().symbol, "WKAVA");
        assert_eq!(pair.reserve0(), U256::from(1_000));
        assert_eq!(pair.reserve1(), U256::from(2_000));
    }

    #[test]
    fn test_pair_contains() {
        let pair = pair(1, 1);

        assert!(pair.involves_token(busd().address));
        assert!(pair.involves_token(wkava().address));
        assert!(!pair.involves_token(dai().address));

        assert_eq!(pair.other_token(busd().address), Some(&wkava()));
        assert_eq!(pair.other_token(dai().address), None);
    }

    #[test]
    fn test_output_amount() {
        let pair = pair(1_000_000, 1_000_000);

        // in_with_fee = 1000 * 9975 = 9_975_000
        // out = 9_975_000 * 1_000_000 / (1_000_000 * 10000 + 9_975_000) = 996
        let out = pair.output_amount(busd().address, U256::from(1_000)).unwrap();
        assert_eq!(out, U256::from(996));
    }

    #[test]
    fn test_input_amount() {
        let pair = pair(1_000_000, 1_000_000);

        // in = 1_000_000 * 996 * 10000 / ((1_000_000 - 996) * 9975) + 1 = 1000
        let input = pair.input_amount(wkava().address, U256::from(996)).unwrap();
        assert_eq!(input, U256::from(1_000));
    }

    #[test]
    fn test_insufficient_liquidity() {
        let empty = pair(0, 0);
        assert_eq!(
            empty.output_amount(busd().address, U256::from(1_000)),
            Err(SdkError::InsufficientReserves)
        );

        let pair = pair(1_000_000, 1_000_000);
        assert_eq!(
            pair.input_amount(wkava().address, U256::from(1_000_000)),
            Err(SdkError::InsufficientReserves)
        );
        assert_eq!(
            pair.output_amount(busd().address, U256::from(1)),
            Err(SdkError::InsufficientInputAmount)
        );
        assert_eq!(
            pair.output_amount(dai().address, U256::from(1)),
            Err(SdkError::UnknownToken(dai().address))
        );
    }
}
