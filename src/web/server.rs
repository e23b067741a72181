use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use super::{api, AppState};
use crate::config::Settings;
use crate::providers::{CoinMarketCapClient, PrivyClient};

/// Builds the gateway router. Kept separate from the listener so tests can
/// drive it with `tower::ServiceExt::oneshot`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(api::health_check))
        .route("/api/price-conversion", get(api::get_price_conversion))
        .route("/api/wallet", post(api::post_wallet))
        .layer(cors)
        .with_state(state)
}

pub async fn start_gateway(settings: &Settings) -> anyhow::Result<()> {
    if settings.market.api_key.is_empty() {
        warn!("No market API key configured; price conversion will fail upstream");
    }
    if settings.wallet.app_id.is_empty() || settings.wallet.app_secret.is_empty() {
        warn!("No wallet credentials configured; wallet operations will fail upstream");
    }

    let state = AppState::new(
        Arc::new(CoinMarketCapClient::new(&settings.market)),
        Arc::new(PrivyClient::new(&settings.wallet)),
        settings.server.rate_limit_per_minute,
    );

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));

    info!("API gateway starting on http://localhost:{}", settings.server.port);
    info!("  Health:           GET  /api/health");
    info!("  Price conversion: GET  /api/price-conversion");
    info!("  Wallet:           POST /api/wallet");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
