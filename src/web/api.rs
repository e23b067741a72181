use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::providers::PriceConversionQuery;
use crate::web::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/price-conversion. Validates the query, forwards it to the
/// market data provider, and relays the upstream body untouched.
pub async fn get_price_conversion(
    State(state): State<AppState>,
    Query(query): Query<PriceConversionQuery>,
) -> Response {
    if state.limiter.check().is_err() {
        warn!("Rate limit exceeded for price conversion");
        return rate_limited();
    }

    if let Err(reason) = query.validate() {
        return bad_request(reason);
    }

    match state.market.price_conversion(&query).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!("Price conversion failed: {}", e);
            upstream_error(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WalletRequest {
    pub action: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default, rename = "walletId")]
    pub wallet_id: Option<String>,
}

/// POST /api/wallet. Dispatches on the `action` field to the wallet
/// custodian. Upstream credentials never leave the server side.
pub async fn post_wallet(State(state): State<AppState>, body: String) -> Response {
    if state.limiter.check().is_err() {
        warn!("Rate limit exceeded for wallet operation");
        return rate_limited();
    }

    let request: WalletRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(_) => return bad_request("Invalid JSON body"),
    };

    let result = match request.action.as_str() {
        "create" => state.custodian.create_wallet().await,
        "sign" => {
            // Console builds send the signing wallet in `recipient`; an
            // explicit walletId wins when both are present.
            let wallet_id = non_empty(&request.wallet_id).or_else(|| non_empty(&request.recipient));
            match (wallet_id, non_empty(&request.message)) {
                (Some(wallet_id), Some(message)) => {
                    state.custodian.sign_message(wallet_id, message).await
                }
                _ => return bad_request("Missing message or recipient"),
            }
        }
        "send" => {
            let wallet_id = non_empty(&request.wallet_id);
            let recipient = non_empty(&request.recipient);
            let amount = non_empty(&request.amount);
            match (wallet_id, recipient, amount) {
                (Some(wallet_id), Some(recipient), Some(amount)) => {
                    state
                        .custodian
                        .send_transaction(wallet_id, recipient, amount)
                        .await
                }
                _ => return bad_request("Missing walletId, recipient, or amount"),
            }
        }
        _ => return bad_request("Invalid action"),
    };

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!("Wallet operation '{}' failed: {}", request.action, e);
            upstream_error(&e)
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn rate_limited() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": "Rate limit exceeded" })),
    )
        .into_response()
}

fn upstream_error(e: &anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}
