use rust_decimal::Decimal;

use crate::types::{LoopFormData, LoopSummary, RiskLevel};

/// Projects strategy form input into the summary shown to the user.
///
/// Pure and synchronous: no channel access, no clock, no globals. The caller
/// re-runs it on every form change. `reference_price` is the ETH/USD price the
/// borrow total is quoted in; it comes from configuration, not from here.
pub fn compute_summary(form: &LoopFormData, reference_price: Decimal) -> LoopSummary {
    let leverage = form.max_leverage;
    let borrowed_exposure = form.collateral_amount * (leverage - Decimal::ONE);

    LoopSummary {
        estimated_apy: form.target_apy * leverage,
        leverage,
        total_deposited: form.collateral_amount,
        total_borrowed: borrowed_exposure * reference_price,
        health_factor: form.min_collateral_ratio,
        risk_level: RiskLevel::from_leverage(leverage),
    }
}
