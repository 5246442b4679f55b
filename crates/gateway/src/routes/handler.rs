//! Request handlers.

use super::types::{GatewayError, HealthResponse, PriceRequest, PriceResponse, Side};
use axum::extract::State;
use axum::Json;
use connectors::{Catalog, ConnectorFactory, ConnectorsResponse, Token, U256};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// State shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    pub catalog: Catalog,
    pub factory: ConnectorFactory,
}

impl AppState {
    pub fn new(catalog: Catalog, factory: ConnectorFactory) -> Self {
        Self { catalog, factory }
    }
}

/// GET /
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /connectors
pub async fn connectors(State(state): State<Arc<AppState>>) -> Json<ConnectorsResponse> {
    Json(state.catalog.response())
}

/// POST /amm/price
pub async fn price(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PriceRequest>,
) -> Result<Json<PriceResponse>, GatewayError> {
    debug!(?req, "price request");

    let connector = state
        .factory
        .connector(&req.connector, &req.chain, &req.network)?;
    if !connector.ready() {
        connector.init().await?;
    }

    let chain = state.factory.chain(&req.chain, &req.network)?;
    let lookup = |symbol: &str| {
        chain
            .get_token_for_symbol(symbol)
            .ok_or_else(|| GatewayError::UnknownToken(symbol.to_string()))
    };
    let base = lookup(&req.base)?;
    let quote = lookup(&req.quote)?;
    let amount = base
        .parse_amount(&req.amount)
        .ok_or_else(|| GatewayError::InvalidAmount(req.amount.clone()))?;

    let slippage = req.allowed_slippage.as_deref();
    let (expected, base_amount, quote_amount) = match req.side {
        Side::Sell => {
            let expected = connector
                .estimate_sell_trade(&base, &quote, amount, slippage)
                .await?;
            let (b, q) = (expected.trade.input_amount, expected.trade.output_amount);
            (expected, b, q)
        }
        Side::Buy => {
            let expected = connector
                .estimate_buy_trade(&quote, &base, amount, slippage)
                .await?;
            let (b, q) = (expected.trade.output_amount, expected.trade.input_amount);
            (expected, b, q)
        }
    };

    let price = unit_price(&base, base_amount, &quote, quote_amount);
    info!(
        connector = %req.connector,
        side = ?req.side,
        base = %base.symbol,
        quote = %quote.symbol,
        %price,
        "priced trade"
    );

    Ok(Json(PriceResponse {
        network: req.network,
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default(),
        base: base.address.to_string(),
        quote: quote.address.to_string(),
        amount: base.format_amount(amount),
        raw_amount: amount.to_string(),
        expected_amount: quote.format_amount(expected.expected_amount),
        price,
        gas_limit: connector.gas_limit_estimate(),
    }))
}

/// Quote per base in whole units.
fn unit_price(base: &Token, base_amount: U256, quote: &Token, quote_amount: U256) -> String {
    let parse = |token: &Token, amount: U256| -> f64 {
        token.format_amount(amount).parse().unwrap_or(0.0)
    };
    let base_units = parse(base, base_amount);
    if base_units == 0.0 {
        return "0".to_string();
    }
    (parse(quote, quote_amount) / base_units).to_string()
}
