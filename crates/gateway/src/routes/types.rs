//! Request, response and error types of the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use connectors::ConnectorError;
use serde::{Deserialize, Serialize};

/// Which side of the market the base token is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// Body of `POST /amm/price`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    pub chain: String,
    pub network: String,
    pub connector: String,
    /// Base token symbol.
    pub base: String,
    /// Quote token symbol.
    pub quote: String,
    /// Amount of base token, in whole units (e.g. `"1.5"`).
    pub amount: String,
    pub side: Side,
    #[serde(default)]
    pub allowed_slippage: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub network: String,
    pub timestamp: u64,
    pub base: String,
    pub quote: String,
    pub amount: String,
    pub raw_amount: String,
    /// Slippage-bounded quote amount: least received for a sell, most paid
    /// for a buy.
    pub expected_amount: String,
    /// Quote per base at the unbounded trade amounts.
    pub price: String,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub error_code: String,
    pub message: String,
}

/// Errors a request handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("token {0} is not supported on this network")]
    UnknownToken(String),

    #[error("invalid amount {0}")]
    InvalidAmount(String),
}

impl GatewayError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::Connector(ConnectorError::Price(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PRICE_FAILED")
            }
            GatewayError::Connector(ConnectorError::Config(_)) => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED")
            }
            GatewayError::Connector(ConnectorError::Transport(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "NETWORK_ERROR")
            }
            GatewayError::Connector(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UNKNOWN_ERROR"),
            GatewayError::UnknownToken(_) => (StatusCode::BAD_REQUEST, "TOKEN_NOT_SUPPORTED"),
            GatewayError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, error_code, "request failed");
        } else {
            tracing::debug!(error = %self, error_code, "request rejected");
        }

        let body = ErrorResponse {
            status_code: status.as_u16(),
            error_code: error_code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
