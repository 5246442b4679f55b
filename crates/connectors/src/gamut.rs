//! Gamut, a constant-product AMM on Kava.

use crate::chain::{ChainProvider, SubmittedTransaction};
use crate::config::GamutConfig;
use crate::connector::{resolve_allowed_slippage, ExecuteTradeParams, ExpectedTrade, Uniswapish};
use crate::error::ConnectorError;
use crate::fetcher::Fetcher;
use crate::router::{best_trade_exact_in, best_trade_exact_out, Trade, TradeOptions};
use crate::swap::{swap_call_parameters, SwapOptions};
use crate::types::{Address, Amount, Percent, Token};
use alloy::json_abi::JsonAbi;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Gamut connector for one network.
pub struct Gamut {
    chain: Arc<dyn ChainProvider>,
    network: String,
    router: Address,
    router_abi: Arc<JsonAbi>,
    gas_limit_estimate: u64,
    ttl: u64,
    allowed_slippage: String,
    wrapped_native: Option<Address>,
    fetcher: Fetcher,
    /// Tokens by address, loaded by `init`.
    token_list: RwLock<HashMap<Address, Token>>,
    ready: AtomicBool,
}

impl Gamut {
    /// Create a connector for `network` trading on `chain`.
    ///
    /// Fails when the network has no Gamut deployment configured.
    pub fn new(
        chain: Arc<dyn ChainProvider>,
        network: &str,
        config: &GamutConfig,
        router_abi: Arc<JsonAbi>,
    ) -> Result<Self, ConnectorError> {
        let contracts = config.contract_addresses.get(network).ok_or_else(|| {
            ConnectorError::Config(format!("gamut is not deployed on network {}", network))
        })?;

        Ok(Self {
            chain,
            network: network.to_string(),
            router: contracts.router_address,
            router_abi,
            gas_limit_estimate: config.gas_limit_estimate,
            ttl: config.ttl,
            allowed_slippage: config.allowed_slippage.clone(),
            wrapped_native: contracts.wrapped_native,
            fetcher: Fetcher::new(contracts, config.fee_bps),
            token_list: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(false),
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// The chain this connector trades on.
    pub fn chain(&self) -> &Arc<dyn ChainProvider> {
        &self.chain
    }

    /// The token pools hold in place of `token`: the wrapped coin for the
    /// native coin, `token` itself otherwise.
    fn pool_token(&self, token: &Token) -> Result<Token, ConnectorError> {
        if !token.is_native() {
            return Ok(token.clone());
        }
        let wrapped = self.wrapped_native.ok_or_else(|| {
            ConnectorError::Config(format!(
                "no wrapped native token configured for gamut on {}",
                self.network
            ))
        })?;
        Ok(self.get_token_by_address(wrapped).unwrap_or_else(|| {
            Token::new(
                token.chain_id,
                wrapped,
                token.decimals,
                format!("W{}", token.symbol),
                format!("Wrapped {}", token.name),
            )
        }))
    }

    fn no_trade(direction: &str, token_in: &Token, token_out: &Token) -> ConnectorError {
        ConnectorError::Price(format!(
            "{}: no trade pair found for {} to {}",
            direction, token_in.address, token_out.address
        ))
    }
}

#[async_trait]
impl Uniswapish for Gamut {
    async fn init(&self) -> Result<(), ConnectorError> {
        if !self.chain.ready() {
            self.chain.init().await?;
        }

        let tokens: HashMap<Address, Token> = self
            .chain
            .stored_token_list()
            .into_iter()
            .map(|token| (token.address, token))
            .collect();
        info!(network = %self.network, tokens = tokens.len(), "gamut initialized");

        *self.token_list.write() = tokens;
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn get_token_by_address(&self, address: Address) -> Option<Token> {
        self.token_list.read().get(&address).cloned()
    }

    fn router(&self) -> Address {
        self.router
    }

    fn router_abi(&self) -> &JsonAbi {
        &self.router_abi
    }

    fn gas_limit_estimate(&self) -> u64 {
        self.gas_limit_estimate
    }

    fn ttl(&self) -> u64 {
        self.ttl
    }

    fn get_allowed_slippage(
        &self,
        allowed_slippage: Option<&str>,
    ) -> Result<Percent, ConnectorError> {
        resolve_allowed_slippage(allowed_slippage, &self.allowed_slippage)
    }

    async fn estimate_sell_trade(
        &self,
        base: &Token,
        quote: &Token,
        amount: Amount,
        allowed_slippage: Option<&str>,
    ) -> Result<ExpectedTrade, ConnectorError> {
        info!(base = %base.address, quote = %quote.address, "fetching pair data");

        let chain = self.chain.as_ref();
        let token_in = self.fetcher.fetch_token_data(chain, &self.pool_token(base)?).await?;
        let token_out = self.fetcher.fetch_token_data(chain, &self.pool_token(quote)?).await?;
        let pair = self.fetcher.fetch_pair_data(chain, &token_in, &token_out).await?;

        let trade = best_trade_exact_in(
            &[pair],
            &token_in,
            amount,
            &token_out,
            TradeOptions::default().with_max_hops(1),
        )?
        .into_iter()
        .next()
        .ok_or_else(|| Self::no_trade("priceSwapIn", base, quote))?
        .with_native(base.is_native(), quote.is_native());
        info!(%trade, "best trade");

        let expected_amount =
            trade.minimum_amount_out(&self.get_allowed_slippage(allowed_slippage)?)?;
        Ok(ExpectedTrade {
            trade,
            expected_amount,
        })
    }

    async fn estimate_buy_trade(
        &self,
        quote: &Token,
        base: &Token,
        amount: Amount,
        allowed_slippage: Option<&str>,
    ) -> Result<ExpectedTrade, ConnectorError> {
        info!(quote = %quote.address, base = %base.address, "fetching pair data");

        let token_in = self.pool_token(quote)?;
        let token_out = self.pool_token(base)?;
        let pair = self
            .fetcher
            .fetch_pair_data(self.chain.as_ref(), &token_in, &token_out)
            .await?;

        let trade = best_trade_exact_out(
            &[pair],
            &token_in,
            &token_out,
            amount,
            TradeOptions::default().with_max_hops(1),
        )?
        .into_iter()
        .next()
        .ok_or_else(|| Self::no_trade("priceSwapOut", quote, base))?
        .with_native(quote.is_native(), base.is_native());
        info!(%trade, "best trade");

        let expected_amount =
            trade.maximum_amount_in(&self.get_allowed_slippage(allowed_slippage)?)?;
        Ok(ExpectedTrade {
            trade,
            expected_amount,
        })
    }

    async fn execute_trade(
        &self,
        wallet: &PrivateKeySigner,
        trade: &Trade,
        params: ExecuteTradeParams<'_>,
    ) -> Result<SubmittedTransaction, ConnectorError> {
        let swap = swap_call_parameters(
            trade,
            &SwapOptions {
                ttl: params.ttl,
                recipient: wallet.address(),
                allowed_slippage: self.get_allowed_slippage(params.allowed_slippage)?,
            },
        )?;
        debug!(method = swap.method_name, value = %swap.value, "swap call");

        let request = TransactionRequest::default()
            .to(params.router)
            .input(swap.encode(params.abi)?.into())
            .value(swap.value)
            .gas_limit(params.gas_limit);

        let chain = Arc::clone(&self.chain);
        let tx = self
            .chain
            .nonce_manager()
            .provide_nonce(params.nonce, wallet.address(), |nonce| async move {
                let request = request.nonce(nonce);
                let request = if params.is_fee_market() {
                    let mut request = request;
                    if let Some(max_fee) = params.max_fee_per_gas {
                        request = request.max_fee_per_gas(max_fee);
                    }
                    if let Some(priority_fee) = params.max_priority_fee_per_gas {
                        request = request.max_priority_fee_per_gas(priority_fee);
                    }
                    request
                } else {
                    request.gas_price(params.gas_price_wei())
                };
                chain.send_transaction(wallet, request).await
            })
            .await?;

        info!(
            tx = %serde_json::to_string(&tx).unwrap_or_else(|_| tx.hash.to_string()),
            "swap submitted"
        );
        Ok(tx)
    }
}

impl std::fmt::Debug for Gamut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamut")
            .field("network", &self.network)
            .field("router", &self.router)
            .field("ready", &self.ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{kava_tokens, GamutConfig};
    use crate::swap::gamut_router_abi;
    use crate::testing::MockChain;
    use crate::types::{NATIVE_TOKEN, U256};
    use alloy::primitives::address;

    const BUSD_WKAVA_POOL: Address = address!("6be57618c8832ad25cceadf2745d5c92de7ab7b2");

    fn busd() -> Token {
        kava_tokens()[1].clone()
    }

    fn wkava() -> Token {
        kava_tokens()[2].clone()
    }

    fn kava() -> Token {
        kava_tokens()[0].clone()
    }

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18))
    }

    fn setup(config: GamutConfig) -> (Gamut, Arc<MockChain>) {
        // BUSD sorts before WKAVA, so reserve0 is BUSD
        let chain = Arc::new(
            MockChain::new(2222, kava_tokens()).with_reserves(BUSD_WKAVA_POOL, e18(1_000), e18(2_000)),
        );
        let abi = Arc::new(gamut_router_abi().unwrap());
        let gamut = Gamut::new(chain.clone(), "mainnet", &config, abi).unwrap();
        (gamut, chain)
    }

    fn wallet() -> PrivateKeySigner {
        PrivateKeySigner::random()
    }

    #[tokio::test]
    async fn test_init_loads_token_map() {
        let (gamut, chain) = setup(GamutConfig::default());
        assert!(!gamut.ready());
        assert_eq!(gamut.get_token_by_address(busd().address), None);

        gamut.init().await.unwrap();
        assert!(gamut.ready());
        assert_eq!(gamut.get_token_by_address(busd().address), Some(busd()));

        // The chain is only initialized once
        gamut.init().await.unwrap();
        assert_eq!(chain.init_count(), 1);
        assert_eq!(gamut.get_token_by_address(wkava().address), Some(wkava()));
    }

    #[test]
    fn test_unknown_network() {
        let chain = Arc::new(MockChain::new(2222, kava_tokens()));
        let abi = Arc::new(gamut_router_abi().unwrap());
        let result = Gamut::new(chain, "testnet", &GamutConfig::default(), abi);
        assert!(matches!(result, Err(ConnectorError::Config(_))));
    }

    #[test]
    fn test_allowed_slippage() {
        let (gamut, _) = setup(GamutConfig::default());
        assert_eq!(gamut.get_allowed_slippage(Some("5/100")).unwrap(), Percent::from_u128(5, 100));
        assert_eq!(gamut.get_allowed_slippage(None).unwrap(), Percent::from_u128(1, 100));

        let (gamut, _) = setup(GamutConfig::default().with_allowed_slippage("one percent"));
        assert!(matches!(
            gamut.get_allowed_slippage(Some("bad")),
            Err(ConnectorError::Config(_))
        ));
        assert!(gamut.get_allowed_slippage(Some("1/3")).is_ok());
    }

    #[test]
    fn test_accessors() {
        let config = GamutConfig::default().with_ttl(60).with_gas_limit_estimate(250_000);
        let (gamut, _) = setup(config.clone());
        assert_eq!(gamut.router(), config.router_address("mainnet").unwrap());
        assert_eq!(gamut.ttl(), 60);
        assert_eq!(gamut.gas_limit_estimate(), 250_000);
        assert!(gamut.router_abi().function("swapExactTokensForTokens").is_some());
    }

    #[tokio::test]
    async fn test_sell_and_buy_use_same_pool() {
        let (gamut, chain) = setup(GamutConfig::default());
        gamut.init().await.unwrap();

        let sell = gamut
            .estimate_sell_trade(&busd(), &wkava(), e18(1), None)
            .await
            .unwrap();
        assert_eq!(sell.trade.route.hops[0].pair.address, BUSD_WKAVA_POOL);
        assert!(sell.expected_amount < sell.trade.output_amount);

        let buy = gamut
            .estimate_buy_trade(&wkava(), &busd(), e18(1), None)
            .await
            .unwrap();
        assert_eq!(buy.trade.route.hops[0].pair.address, BUSD_WKAVA_POOL);
        assert!(buy.expected_amount > buy.trade.input_amount);

        assert_eq!(chain.reserve_reads(), vec![BUSD_WKAVA_POOL, BUSD_WKAVA_POOL]);
    }

    #[tokio::test]
    async fn test_native_coin_routes_through_wrapped_pool() {
        let (gamut, chain) = setup(GamutConfig::default());
        gamut.init().await.unwrap();

        let sell = gamut
            .estimate_sell_trade(&kava(), &busd(), e18(1), None)
            .await
            .unwrap();
        assert!(sell.trade.native_in);
        assert_eq!(sell.trade.input_token, wkava());
        assert_eq!(chain.reserve_reads(), vec![BUSD_WKAVA_POOL]);
        assert_eq!(kava().address, NATIVE_TOKEN);
    }

    #[tokio::test]
    async fn test_empty_pool_is_a_price_error() {
        let (gamut, chain) = setup(GamutConfig::default());
        chain.set_reserves(BUSD_WKAVA_POOL, U256::ZERO, U256::ZERO);
        gamut.init().await.unwrap();

        let sell = gamut.estimate_sell_trade(&busd(), &wkava(), e18(1), None).await;
        assert!(matches!(sell, Err(ConnectorError::Price(_))));

        let buy = gamut.estimate_buy_trade(&wkava(), &busd(), e18(1), None).await;
        assert!(matches!(buy, Err(e) if e.is_price_error()));
    }

    #[tokio::test]
    async fn test_execute_trade_legacy_gas() {
        let (gamut, chain) = setup(GamutConfig::default());
        gamut.init().await.unwrap();
        let sell = gamut
            .estimate_sell_trade(&busd(), &wkava(), e18(1), None)
            .await
            .unwrap();

        let wallet = wallet();
        let params = ExecuteTradeParams {
            gas_price: 2.0,
            router: gamut.router(),
            ttl: gamut.ttl(),
            abi: gamut.router_abi(),
            gas_limit: gamut.gas_limit_estimate(),
            nonce: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            allowed_slippage: None,
        };
        let tx = gamut.execute_trade(&wallet, &sell.trade, params).await.unwrap();

        assert_eq!(tx.from, wallet.address());
        assert_eq!(tx.to, Some(gamut.router()));
        assert_eq!(tx.nonce, 0);
        assert_eq!(tx.gas_price, Some(2_000_000_000));
        assert_eq!(tx.max_fee_per_gas, None);
        assert_eq!(tx.max_priority_fee_per_gas, None);
        assert_eq!(tx.gas_limit, Some(300_000));
        assert_eq!(chain.sent().len(), 1);

        // The next trade from the same wallet takes the next nonce
        let tx = gamut.execute_trade(&wallet, &sell.trade, params).await.unwrap();
        assert_eq!(tx.nonce, 1);
    }

    #[tokio::test]
    async fn test_execute_trade_fee_market() {
        let (gamut, _) = setup(GamutConfig::default());
        gamut.init().await.unwrap();
        let buy = gamut
            .estimate_buy_trade(&kava(), &busd(), e18(1), None)
            .await
            .unwrap();

        let params = ExecuteTradeParams {
            gas_price: 2.0,
            router: gamut.router(),
            ttl: gamut.ttl(),
            abi: gamut.router_abi(),
            gas_limit: gamut.gas_limit_estimate(),
            nonce: Some(9),
            max_fee_per_gas: Some(30_000_000_000),
            max_priority_fee_per_gas: None,
            allowed_slippage: Some("2/100"),
        };
        let tx = gamut.execute_trade(&wallet(), &buy.trade, params).await.unwrap();

        assert_eq!(tx.nonce, 9);
        assert_eq!(tx.gas_price, None);
        assert_eq!(tx.max_fee_per_gas, Some(30_000_000_000));
        // Native input pays the marked-up maximum as value
        assert_eq!(tx.value, Percent::from_u128(2, 100).markup(buy.trade.input_amount).unwrap());
    }

    #[tokio::test]
    async fn test_rejected_send_keeps_nonce() {
        let (gamut, chain) = setup(GamutConfig::default());
        gamut.init().await.unwrap();
        let sell = gamut
            .estimate_sell_trade(&busd(), &wkava(), e18(1), None)
            .await
            .unwrap();

        let wallet = wallet();
        let params = ExecuteTradeParams {
            gas_price: 1.0,
            router: gamut.router(),
            ttl: gamut.ttl(),
            abi: gamut.router_abi(),
            gas_limit: gamut.gas_limit_estimate(),
            nonce: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            allowed_slippage: None,
        };

        chain.reject_sends(true);
        let result = gamut.execute_trade(&wallet, &sell.trade, params).await;
        assert!(matches!(result, Err(ConnectorError::Transport(_))));

        chain.reject_sends(false);
        let tx = gamut.execute_trade(&wallet, &sell.trade, params).await.unwrap();
        assert_eq!(tx.nonce, 0);
    }
}
