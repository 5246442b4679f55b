//! Signing and broadcasting through `EvmChain` against an in-process JSON-RPC
//! node that records every raw transaction it receives.

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{keccak256, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use connectors::config::NetworkConfig;
use connectors::{Address, ChainProvider, EvmChain, SubmittedTransaction};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

const GWEI: u128 = 1_000_000_000;

#[derive(Default)]
struct Node {
    raw: Mutex<Vec<Bytes>>,
    methods: Mutex<Vec<String>>,
}

impl Node {
    fn broadcast(&self) -> Vec<TxEnvelope> {
        self.raw
            .lock()
            .iter()
            .map(|raw| TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap())
            .collect()
    }

    fn called(&self, method: &str) -> bool {
        self.methods.lock().iter().any(|m| m == method)
    }
}

async fn rpc(State(node): State<Arc<Node>>, Json(request): Json<Value>) -> Json<Value> {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    node.methods.lock().push(method.clone());

    let result = match method.as_str() {
        "eth_chainId" => json!("0x8ae"),
        // Base fee 1 gwei, median tip 1 gwei
        "eth_feeHistory" => json!({
            "oldestBlock": "0x1",
            "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
            "gasUsedRatio": [0.5],
            "reward": [["0x3b9aca00"]],
        }),
        "eth_sendRawTransaction" => {
            let raw: Bytes = request["params"][0].as_str().unwrap().parse().unwrap();
            let hash = keccak256(&raw);
            node.raw.lock().push(raw);
            json!(hash)
        }
        other => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": { "code": -32601, "message": format!("method {other} not served") },
            }))
        }
    };
    Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }))
}

async fn start_node() -> (EvmChain, Arc<Node>) {
    let node = Arc::new(Node::default());
    let app = Router::new().route("/", post(rpc)).with_state(node.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let config = NetworkConfig {
        chain_id: 2222,
        node_url: url,
        tokens: Vec::new(),
    };
    (EvmChain::new("kava", "mainnet", &config).unwrap(), node)
}

fn swap_request() -> TransactionRequest {
    TransactionRequest::default()
        .to(Address::repeat_byte(0x92))
        .nonce(7)
        .gas_limit(300_000)
}

#[tokio::test]
async fn test_supplied_fee_cap_is_broadcast() {
    let (chain, node) = start_node().await;
    let wallet = PrivateKeySigner::random();

    let submitted = chain
        .send_transaction(&wallet, swap_request().max_fee_per_gas(30 * GWEI))
        .await
        .unwrap();

    let sent = node.broadcast();
    assert_eq!(sent.len(), 1);
    let envelope = &sent[0];
    assert_eq!(envelope.max_fee_per_gas(), 30 * GWEI);
    // Only the missing tip comes from the fee history
    assert_eq!(envelope.max_priority_fee_per_gas(), Some(GWEI));
    assert_eq!(envelope.chain_id(), Some(2222));
    assert_eq!(envelope.nonce(), 7);

    assert_eq!(submitted, SubmittedTransaction::from_envelope(wallet.address(), envelope));
    assert_eq!(submitted.hash, keccak256(node.raw.lock()[0].as_ref()));
    assert_eq!(submitted.max_fee_per_gas, Some(30 * GWEI));
}

#[tokio::test]
async fn test_supplied_tip_raises_estimated_cap() {
    let (chain, node) = start_node().await;
    let wallet = PrivateKeySigner::random();

    let submitted = chain
        .send_transaction(&wallet, swap_request().max_priority_fee_per_gas(50 * GWEI))
        .await
        .unwrap();

    let envelope = &node.broadcast()[0];
    assert_eq!(envelope.max_priority_fee_per_gas(), Some(50 * GWEI));
    // The estimated cap of 3 gwei would be below the tip
    assert_eq!(envelope.max_fee_per_gas(), 50 * GWEI);
    assert_eq!(submitted.max_fee_per_gas, Some(50 * GWEI));
}

#[tokio::test]
async fn test_complete_fee_fields_skip_estimation() {
    let (chain, node) = start_node().await;
    let wallet = PrivateKeySigner::random();

    let request = swap_request()
        .max_fee_per_gas(5 * GWEI)
        .max_priority_fee_per_gas(2 * GWEI);
    chain.send_transaction(&wallet, request).await.unwrap();

    let envelope = &node.broadcast()[0];
    assert_eq!(envelope.max_fee_per_gas(), 5 * GWEI);
    assert_eq!(envelope.max_priority_fee_per_gas(), Some(2 * GWEI));
    assert!(!node.called("eth_feeHistory"));
}

#[tokio::test]
async fn test_legacy_gas_price_is_broadcast() {
    let (chain, node) = start_node().await;
    let wallet = PrivateKeySigner::random();

    let submitted = chain
        .send_transaction(&wallet, swap_request().gas_price(2 * GWEI))
        .await
        .unwrap();

    let envelope = &node.broadcast()[0];
    assert!(!envelope.is_dynamic_fee());
    assert_eq!(envelope.gas_price(), Some(2 * GWEI));
    assert_eq!(envelope.gas_limit(), 300_000);
    assert_eq!(submitted.gas_price, Some(2 * GWEI));
    assert_eq!(submitted.max_fee_per_gas, None);
    assert!(!node.called("eth_feeHistory"));
}
