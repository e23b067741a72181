use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Banded classification of configured leverage, shown next to the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Leverage up to 1.5x is Low, up to 2.5x Medium, anything above High.
    pub fn from_leverage(leverage: Decimal) -> Self {
        if leverage <= dec!(1.5) {
            RiskLevel::Low
        } else if leverage <= dec!(2.5) {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Projection of [`LoopFormData`](super::LoopFormData) shown in the strategy
/// summary panel. Health factor is a pass-through of the configured minimum
/// collateral ratio, not a live on-chain ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_apy: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub leverage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_deposited: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_borrowed: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub health_factor: Decimal,
    pub risk_level: RiskLevel,
}

impl fmt::Display for LoopSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Strategy Summary ===")?;
        writeln!(f, "Estimated APY:    {:.2}%", self.estimated_apy)?;
        writeln!(f, "Leverage:         {:.2}x", self.leverage)?;
        writeln!(f, "Total Deposited:  {} ETH", self.total_deposited)?;
        writeln!(f, "Total Borrowed:   ${:.2}", self.total_borrowed)?;
        writeln!(f, "Health Factor:    {:.2}", self.health_factor)?;
        write!(f, "Risk Level:       {}", self.risk_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_band_boundaries() {
        assert_eq!(RiskLevel::from_leverage(dec!(1.0)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_leverage(dec!(1.5)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_leverage(dec!(1.50001)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_leverage(dec!(2.5)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_leverage(dec!(2.50001)), RiskLevel::High);
        assert_eq!(RiskLevel::from_leverage(dec!(3.0)), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_display() {
        assert_eq!(RiskLevel::Low.to_string(), "Low");
        assert_eq!(RiskLevel::Medium.to_string(), "Medium");
        assert_eq!(RiskLevel::High.to_string(), "High");
    }

    #[test]
    fn test_summary_serializes_as_numbers() {
        let summary = LoopSummary {
            estimated_apy: dec!(20),
            leverage: dec!(2),
            total_deposited: dec!(1),
            total_borrowed: dec!(2000),
            health_factor: dec!(1.5),
            risk_level: RiskLevel::Medium,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["estimated_apy"], 20.0);
        assert_eq!(value["total_borrowed"], 2000.0);
        assert_eq!(value["risk_level"], "Medium");
    }
}
