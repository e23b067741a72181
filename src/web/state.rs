use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::providers::{MarketData, WalletCustodian};

/// Shared state handed to every gateway handler. Providers are trait
/// objects so tests can substitute mocks for the upstream APIs.
#[derive(Clone)]
pub struct AppState {
    pub market: Arc<dyn MarketData>,
    pub custodian: Arc<dyn WalletCustodian>,
    pub limiter: Arc<DefaultDirectRateLimiter>,
}

impl AppState {
    pub fn new(
        market: Arc<dyn MarketData>,
        custodian: Arc<dyn WalletCustodian>,
        rate_limit_per_minute: u32,
    ) -> Self {
        let per_minute = NonZeroU32::new(rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            market,
            custodian,
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        }
    }
}
