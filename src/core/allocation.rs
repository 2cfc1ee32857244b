use serde::{Deserialize, Serialize};

use super::error::{PlanError, PlanResult};

/// Treasury rate the base yields in an allocation table are quoted against.
pub const BASE_TREASURY_RATE: f64 = 0.04;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetClass {
    pub name: String,
    pub weight: f64,
    pub base_yield: f64,
    /// Share of a treasury-rate move passed through to this class's yield.
    pub rate_sensitivity: f64,
}

/// Static target allocation consumed as configuration; blended into a single `portfolio_yield`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationTable {
    pub classes: Vec<AssetClass>,
}

impl AllocationTable {
    /// Seven-class income allocation: fixed income tracks treasuries 1:1, equities and REITs 0.5:1.
    pub fn default_income() -> Self {
        let class = |name: &str, weight, base_yield, rate_sensitivity| AssetClass {
            name: name.to_string(),
            weight,
            base_yield,
            rate_sensitivity,
        };
        Self {
            classes: vec![
                class("Dividend Growth Stocks", 0.30, 0.025, 0.5),
                class("High-Yield Bonds", 0.20, 0.055, 1.0),
                class("REITs", 0.10, 0.045, 0.5),
                class("Treasury/TIPS", 0.15, 0.040, 1.0),
                class("Preferred Stock", 0.05, 0.060, 1.0),
                class("Cash/Money Market", 0.08, 0.040, 1.0),
                class("Growth Equities", 0.12, 0.010, 0.5),
            ],
        }
    }

    pub fn validate(&self) -> PlanResult<()> {
        if self.classes.is_empty() {
            return Err(PlanError::InvalidAllocation(
                "at least one asset class is required".to_string(),
            ));
        }
        if let Some(bad) = self
            .classes
            .iter()
            .find(|c| !c.weight.is_finite() || c.weight < 0.0 || !c.base_yield.is_finite())
        {
            return Err(PlanError::InvalidAllocation(format!(
                "asset class '{}' has an invalid weight or yield",
                bad.name
            )));
        }
        let total = self.classes.iter().map(|c| c.weight).sum::<f64>();
        if (total - 1.0).abs() > 1e-6 {
            return Err(PlanError::InvalidAllocation(format!(
                "weights must sum to 1 (got {total})"
            )));
        }
        Ok(())
    }

    pub fn blended_yield(&self, treasury_rate: f64) -> PlanResult<f64> {
        self.validate()?;
        let shift = treasury_rate - BASE_TREASURY_RATE;
        Ok(self
            .classes
            .iter()
            .map(|c| c.weight * (c.base_yield + c.rate_sensitivity * shift))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn default_table_blends_to_base_yield_at_base_treasury_rate() {
        let table = AllocationTable::default_income();
        table.validate().expect("default table is valid");
        let expected = 0.30 * 0.025
            + 0.20 * 0.055
            + 0.10 * 0.045
            + 0.15 * 0.040
            + 0.05 * 0.060
            + 0.08 * 0.040
            + 0.12 * 0.010;
        assert_approx(
            table.blended_yield(BASE_TREASURY_RATE).expect("valid"),
            expected,
        );
    }

    #[test]
    fn treasury_moves_pass_through_by_sensitivity() {
        let table = AllocationTable::default_income();
        let base = table.blended_yield(0.04).expect("valid");
        let higher = table.blended_yield(0.05).expect("valid");
        // Fixed income weight 0.48 at 1:1, equity weight 0.52 at 0.5:1.
        assert_approx(higher - base, 0.01 * (0.48 + 0.52 * 0.5));
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        let mut table = AllocationTable::default_income();
        table.classes.pop();
        let err = table.blended_yield(0.04).expect_err("must reject");
        assert!(matches!(err, PlanError::InvalidAllocation(_)));

        let empty = AllocationTable { classes: vec![] };
        assert!(empty.validate().is_err());
    }
}
