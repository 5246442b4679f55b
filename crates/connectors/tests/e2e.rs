//! End-to-end tests for the connector lifecycle.

use alloy::primitives::address;
use alloy::signers::local::PrivateKeySigner;
use connectors::config::kava_tokens;
use connectors::testing::MockChain;
use connectors::{
    best_trade_exact_in, Address, Catalog, ChainSet, ConnectorFactory,
    ExecuteTradeParams, GatewayConfig, Pair, Percent, Token, TradeOptions, TradingType,
    Uniswapish, U256,
};
use std::sync::Arc;

const BUSD_WKAVA: Address = address!("6be57618c8832ad25cceadf2745d5c92de7ab7b2");

// Kava mainnet tokens from the default configuration
fn kava() -> Token {
    kava_tokens()[0].clone()
}

fn busd() -> Token {
    kava_tokens()[1].clone()
}

fn wkava() -> Token {
    kava_tokens()[2].clone()
}

// Helper to create amounts with decimals
fn amount(units: u64) -> U256 {
    U256::from(units) * U256::from(10u64.pow(18))
}

/// Set up a factory over a mock Kava chain with a funded BUSD/WKAVA pool.
fn setup_gateway() -> (GatewayConfig, ConnectorFactory, Arc<MockChain>) {
    let config = GatewayConfig::default();
    let chain = Arc::new(MockChain::with_start_nonce(2222, kava_tokens(), 42).with_reserves(
        BUSD_WKAVA,
        amount(500_000),
        amount(1_000_000),
    ));
    let chains = ChainSet::default().with_chain("kava", "mainnet", chain.clone());
    let factory = ConnectorFactory::new(&config, chains).unwrap();
    (config, factory, chain)
}

fn execute_params(connector: &dyn Uniswapish) -> ExecuteTradeParams<'_> {
    ExecuteTradeParams {
        gas_price: 1.0,
        router: connector.router(),
        ttl: connector.ttl(),
        abi: connector.router_abi(),
        gas_limit: connector.gas_limit_estimate(),
        nonce: None,
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
        allowed_slippage: None,
    }
}

#[tokio::test]
async fn test_quote_and_execute_flow() {
    let (_, factory, chain) = setup_gateway();

    let connector = factory.connector("gamut", "kava", "mainnet").unwrap();
    assert!(!connector.ready());
    connector.init().await.unwrap();
    assert!(connector.ready());

    // Sell 100 BUSD for WKAVA at the default 1% slippage
    let quote = connector
        .estimate_sell_trade(&busd(), &wkava(), amount(100), None)
        .await
        .unwrap();
    assert_eq!(quote.trade.input_amount, amount(100));
    assert_eq!(
        quote.expected_amount,
        Percent::from_u128(1, 100).discount(quote.trade.output_amount).unwrap()
    );

    let wallet = PrivateKeySigner::random();
    let tx = connector
        .execute_trade(&wallet, &quote.trade, execute_params(connector.as_ref()))
        .await
        .unwrap();

    assert_eq!(tx.nonce, 42);
    assert_eq!(tx.to, Some(connector.router()));
    assert_eq!(tx.value, U256::ZERO);
    assert_eq!(tx.gas_price, Some(1_000_000_000));

    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    let selector = connector.router_abi().function("swapExactTokensForTokens").unwrap()[0].selector();
    assert_eq!(sent[0].input.input().unwrap()[..4], selector[..]);
}

#[tokio::test]
async fn test_buy_native_coin() {
    let (_, factory, _) = setup_gateway();
    let connector = factory.get_instance("kava", "mainnet").unwrap();
    connector.init().await.unwrap();

    // Buy 10 KAVA, paying BUSD
    let quote = connector
        .estimate_buy_trade(&busd(), &kava(), amount(10), Some("3/100"))
        .await
        .unwrap();
    assert!(quote.trade.native_out);
    assert_eq!(quote.trade.output_amount, amount(10));
    assert_eq!(
        quote.expected_amount,
        Percent::from_u128(3, 100).markup(quote.trade.input_amount).unwrap()
    );

    let wallet = PrivateKeySigner::random();
    let params = ExecuteTradeParams {
        max_fee_per_gas: Some(5_000_000_000),
        max_priority_fee_per_gas: Some(1_000_000_000),
        allowed_slippage: Some("3/100"),
        ..execute_params(connector.as_ref())
    };
    let tx = connector.execute_trade(&wallet, &quote.trade, params).await.unwrap();
    assert_eq!(tx.gas_price, None);
    assert_eq!(tx.max_fee_per_gas, Some(5_000_000_000));
    assert_eq!(tx.max_priority_fee_per_gas, Some(1_000_000_000));
}

#[tokio::test]
async fn test_pair_without_pool_fails() {
    let (_, factory, _) = setup_gateway();
    let connector = factory.get_instance("kava", "mainnet").unwrap();
    connector.init().await.unwrap();

    // No contract behind the derived pair address
    let usdc = kava_tokens()[3].clone();
    let result = connector.estimate_buy_trade(&usdc, &busd(), amount(1), None).await;
    let err = result.unwrap_err();
    assert!(err.is_price_error(), "{err}");
}

#[test]
fn test_factory_identity() {
    let (_, factory, _) = setup_gateway();

    let first = factory.get_instance("kava", "mainnet").unwrap();
    let second = factory.get_instance("kava", "mainnet").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_catalog_from_config() {
    let (config, _, _) = setup_gateway();
    let catalog = Catalog::from_config(&config);

    let names: Vec<&str> = catalog.connectors().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names.first(), Some(&"uniswap"));
    assert!(names.contains(&"gamut"));
    assert!(names.contains(&"injective_perpetual"));

    let reference = catalog.get("ref").unwrap();
    assert_eq!(reference.trading_type, vec![TradingType::NearAmm]);
    assert_eq!(reference.available_networks[0].chain, "near");
}

#[test]
fn test_multi_hop_best_trade() {
    let token = |byte: u8, symbol: &str| Token::new(2222, Address::repeat_byte(byte), 18, symbol, symbol);
    let (a, b, c) = (token(0x01, "A"), token(0x02, "B"), token(0x03, "C"));

    let pairs = [
        Pair::new(Address::repeat_byte(0xab), (a.clone(), amount(100)), (b.clone(), amount(100)), 25),
        Pair::new(Address::repeat_byte(0xbc), (b.clone(), amount(100)), (c.clone(), amount(100)), 25),
    ];

    let trades = best_trade_exact_in(&pairs, &a, amount(1), &c, TradeOptions::default()).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].route.path(), vec![a.address, b.address, c.address]);

    // Fees are taken on both hops
    let one_hop = pairs[0].output_amount(a.address, amount(1)).unwrap();
    assert!(trades[0].output_amount < one_hop);

    let direct_only = best_trade_exact_in(
        &pairs,
        &a,
        amount(1),
        &c,
        TradeOptions::default().with_max_hops(1),
    )
    .unwrap();
    assert!(direct_only.is_empty());
}
