//! On-chain token and pair data.

use crate::chain::ChainProvider;
use crate::config::{GamutNetworkConfig, PoolAddress};
use crate::error::ConnectorError;
use crate::pair::{pair_salt, Pair};
use crate::types::{Address, Token, B256, U256};
use alloy::primitives::Bytes;
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

sol! {
    interface IPair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    interface IERC20Metadata {
        function decimals() external view returns (uint8);
    }
}

/// Reads token decimals and pair reserves through a chain provider.
#[derive(Debug)]
pub struct Fetcher {
    factory: Address,
    init_code_hash: B256,
    pools: Vec<PoolAddress>,
    fee_bps: u32,
    /// Decimals by token address, filled on first read.
    decimals: RwLock<HashMap<Address, u8>>,
}

impl Fetcher {
    pub fn new(contracts: &GamutNetworkConfig, fee_bps: u32) -> Self {
        Self {
            factory: contracts.factory_address,
            init_code_hash: contracts.init_code_hash,
            pools: contracts.pools.clone(),
            fee_bps,
            decimals: RwLock::new(HashMap::new()),
        }
    }

    /// Address of the pair contract for two tokens.
    ///
    /// Known pools take precedence; otherwise the address is derived with
    /// CREATE2 from the factory and the pair init code hash.
    pub fn pair_address(&self, token_a: Address, token_b: Address) -> Address {
        if let Some(pool) = self.pools.iter().find(|p| p.matches(token_a, token_b)) {
            return pool.address;
        }
        self.factory
            .create2(pair_salt(token_a, token_b), self.init_code_hash)
    }

    async fn read(
        chain: &dyn ChainProvider,
        to: Address,
        calldata: Vec<u8>,
    ) -> Result<Bytes, ConnectorError> {
        chain
            .call(TransactionRequest::default().to(to).input(Bytes::from(calldata).into()))
            .await
    }

    /// Return `token` with its decimals as reported by the token contract.
    pub async fn fetch_token_data(
        &self,
        chain: &dyn ChainProvider,
        token: &Token,
    ) -> Result<Token, ConnectorError> {
        let cached = self.decimals.read().get(&token.address).copied();
        let decimals = match cached {
            Some(decimals) => decimals,
            None => {
                let ret = Self::read(
                    chain,
                    token.address,
                    IERC20Metadata::decimalsCall::SELECTOR.to_vec(),
                )
                .await?;
                let decimals = IERC20Metadata::decimalsCall::abi_decode_returns(&ret)?;
                self.decimals.write().insert(token.address, decimals);
                decimals
            }
        };

        Ok(Token {
            decimals,
            ..token.clone()
        })
    }

    /// Read the reserves of the pair trading `token_a` against `token_b`.
    pub async fn fetch_pair_data(
        &self,
        chain: &dyn ChainProvider,
        token_a: &Token,
        token_b: &Token,
    ) -> Result<Pair, ConnectorError> {
        let address = self.pair_address(token_a.address, token_b.address);
        debug!(pair = %address, a = %token_a.symbol, b = %token_b.symbol, "fetching reserves");

        let ret = Self::read(chain, address, IPair::getReservesCall::SELECTOR.to_vec()).await?;
        if ret.is_empty() {
            return Err(ConnectorError::Price(format!(
                "no pool for {}-{} at {}",
                token_a.symbol, token_b.symbol, address
            )));
        }
        let (reserve0, reserve1, _timestamp) = <(U256, U256, u32)>::abi_decode(&ret)?;

        // Reserves are reported in address order
        let (reserve_a, reserve_b) = if token_a.sorts_before(token_b) {
            (reserve0, reserve1)
        } else {
            (reserve1, reserve0)
        };

        Ok(Pair::new(
            address,
            (token_a.clone(), reserve_a),
            (token_b.clone(), reserve_b),
            self.fee_bps,
        ))
    }
}

/// Calldata selectors served by the pair and token contracts.
pub mod selectors {
    use super::{IERC20Metadata, IPair};
    use alloy::sol_types::SolCall;

    pub const GET_RESERVES: [u8; 4] = IPair::getReservesCall::SELECTOR;
    pub const DECIMALS: [u8; 4] = IERC20Metadata::decimalsCall::SELECTOR;
}
