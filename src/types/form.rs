#![allow(dead_code)]
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Maximum acceptable price deviation for loop rebalancing trades.
/// The strategy backend only accepts these three values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlippageTolerance {
    TenthPercent,
    HalfPercent,
    OnePercent,
}

impl SlippageTolerance {
    pub fn as_percent(&self) -> Decimal {
        match self {
            SlippageTolerance::TenthPercent => dec!(0.1),
            SlippageTolerance::HalfPercent => dec!(0.5),
            SlippageTolerance::OnePercent => dec!(1.0),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            SlippageTolerance::TenthPercent => 0.1,
            SlippageTolerance::HalfPercent => 0.5,
            SlippageTolerance::OnePercent => 1.0,
        }
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        // The set is fixed; tolerate float noise from JSON decoding.
        let matches = |target: f64| (value - target).abs() < 1e-9;
        if matches(0.1) {
            Some(SlippageTolerance::TenthPercent)
        } else if matches(0.5) {
            Some(SlippageTolerance::HalfPercent)
        } else if matches(1.0) {
            Some(SlippageTolerance::OnePercent)
        } else {
            None
        }
    }

    pub fn all() -> Vec<SlippageTolerance> {
        vec![
            SlippageTolerance::TenthPercent,
            SlippageTolerance::HalfPercent,
            SlippageTolerance::OnePercent,
        ]
    }
}

impl fmt::Display for SlippageTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percent())
    }
}

// On the wire the tolerance travels as a bare JSON number.
impl Serialize for SlippageTolerance {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for SlippageTolerance {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        SlippageTolerance::from_f64(value).ok_or_else(|| {
            de::Error::custom(format!(
                "slippage tolerance {} is not one of 0.1, 0.5, 1.0",
                value
            ))
        })
    }
}

/// User-entered parameters for an ETH yield-loop strategy. An immutable
/// snapshot of this struct is what travels inside `strategy_select` and what
/// the summary calculator projects from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopFormData {
    #[serde(with = "rust_decimal::serde::float")]
    pub collateral_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_leverage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_collateral_ratio: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub target_apy: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub rebalance_threshold: Decimal,
    pub slippage_tolerance: SlippageTolerance,
}

impl Default for LoopFormData {
    fn default() -> Self {
        Self {
            collateral_amount: Decimal::ZERO,
            max_leverage: dec!(3.0),
            min_collateral_ratio: dec!(1.5),
            target_apy: dec!(10.0),
            rebalance_threshold: dec!(5.0),
            slippage_tolerance: SlippageTolerance::HalfPercent,
        }
    }
}

impl LoopFormData {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.collateral_amount < Decimal::ZERO {
            errors.push("collateral_amount must be >= 0".to_string());
        }
        if self.max_leverage < dec!(1.0) || self.max_leverage > dec!(3.0) {
            errors.push("max_leverage must be between 1.0 and 3.0".to_string());
        }
        if self.min_collateral_ratio < dec!(1.0) {
            errors.push("min_collateral_ratio must be >= 1.0".to_string());
        }
        if self.target_apy < Decimal::ZERO {
            errors.push("target_apy must be >= 0".to_string());
        }
        if self.rebalance_threshold < Decimal::ZERO {
            errors.push("rebalance_threshold must be >= 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_form_is_valid() {
        let form = LoopFormData::default();
        assert!(form.validate().is_ok());
        assert_eq!(form.max_leverage, dec!(3.0));
        assert_eq!(form.min_collateral_ratio, dec!(1.5));
        assert_eq!(form.target_apy, dec!(10.0));
        assert_eq!(form.rebalance_threshold, dec!(5.0));
        assert_eq!(form.slippage_tolerance, SlippageTolerance::HalfPercent);
    }

    #[test]
    fn test_validate_rejects_out_of_range_leverage() {
        let mut form = LoopFormData::default();
        form.max_leverage = dec!(3.5);
        let errors = form.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("max_leverage")));

        form.max_leverage = dec!(0.9);
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let form = LoopFormData {
            collateral_amount: dec!(-1),
            max_leverage: dec!(5),
            min_collateral_ratio: dec!(0.5),
            target_apy: dec!(-2),
            rebalance_threshold: dec!(-1),
            slippage_tolerance: SlippageTolerance::OnePercent,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_slippage_fixed_set() {
        assert_eq!(
            SlippageTolerance::from_f64(0.1),
            Some(SlippageTolerance::TenthPercent)
        );
        assert_eq!(
            SlippageTolerance::from_f64(0.5),
            Some(SlippageTolerance::HalfPercent)
        );
        assert_eq!(
            SlippageTolerance::from_f64(1.0),
            Some(SlippageTolerance::OnePercent)
        );
        assert_eq!(SlippageTolerance::from_f64(0.3), None);
        assert_eq!(SlippageTolerance::all().len(), 3);
    }

    #[test]
    fn test_form_serializes_as_json_numbers() {
        let form = LoopFormData {
            collateral_amount: dec!(1.5),
            ..LoopFormData::default()
        };
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(
            value,
            json!({
                "collateral_amount": 1.5,
                "max_leverage": 3.0,
                "min_collateral_ratio": 1.5,
                "target_apy": 10.0,
                "rebalance_threshold": 5.0,
                "slippage_tolerance": 0.5,
            })
        );
    }

    #[test]
    fn test_form_round_trips_through_json() {
        let form = LoopFormData {
            collateral_amount: dec!(2),
            max_leverage: dec!(2.5),
            slippage_tolerance: SlippageTolerance::TenthPercent,
            ..LoopFormData::default()
        };
        let text = serde_json::to_string(&form).unwrap();
        let back: LoopFormData = serde_json::from_str(&text).unwrap();
        assert_eq!(back, form);
    }

    #[test]
    fn test_unknown_slippage_value_rejected() {
        let result: Result<SlippageTolerance, _> = serde_json::from_str("0.25");
        assert!(result.is_err());
    }
}
