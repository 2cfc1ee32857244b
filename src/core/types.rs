use serde::Serialize;

use super::error::{PlanError, PlanResult};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Accumulation,
    Withdrawal,
}

/// Reporting-only tag for notable ages; never consulted for control flow.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Milestone {
    CurrentAge,
    WithdrawalStart,
    SocialSecurityStart,
    TargetAge,
}

/// Immutable inputs for one projection or simulation run. Rates are fractions (0.06 = 6%).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub starting_portfolio: f64,
    pub current_age: u32,
    pub withdrawal_start_age: u32,
    pub social_security_start_age: u32,
    pub target_age: u32,
    pub inflation_rate: f64,
    pub expected_return: f64,
    pub return_volatility: f64,
    pub portfolio_yield: f64,
    /// Applied to yield income only.
    pub tax_rate: f64,
    pub annual_reinvestment_cap: f64,
    pub one_time_contribution: f64,
    pub one_time_contribution_age: u32,
    pub social_security_monthly: f64,
    pub base_annual_expenses: f64,
    pub target_portfolio_value: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            starting_portfolio: 0.0,
            current_age: 51,
            withdrawal_start_age: 55,
            social_security_start_age: 67,
            target_age: 90,
            inflation_rate: 0.03,
            expected_return: 0.06,
            return_volatility: 0.15,
            portfolio_yield: 0.0431,
            tax_rate: 0.15,
            annual_reinvestment_cap: 20_000.0,
            one_time_contribution: 250_000.0,
            one_time_contribution_age: 54,
            social_security_monthly: 0.0,
            base_annual_expenses: 0.0,
            target_portfolio_value: 4_250_000.0,
        }
    }
}

impl SimulationParameters {
    pub fn validate(&self) -> PlanResult<()> {
        if !(self.target_age > self.withdrawal_start_age
            && self.withdrawal_start_age >= self.current_age)
        {
            return Err(PlanError::AgeOrdering {
                current_age: self.current_age,
                withdrawal_start_age: self.withdrawal_start_age,
                target_age: self.target_age,
            });
        }

        for (field, value) in [
            ("inflation_rate", self.inflation_rate),
            ("expected_return", self.expected_return),
            ("portfolio_yield", self.portfolio_yield),
            ("tax_rate", self.tax_rate),
        ] {
            if !value.is_finite() || value <= -1.0 {
                return Err(PlanError::InvalidRate { field, value });
            }
        }

        if !self.return_volatility.is_finite() || self.return_volatility < 0.0 {
            return Err(PlanError::InvalidVolatility(self.return_volatility));
        }

        for (field, value) in [
            ("starting_portfolio", self.starting_portfolio),
            ("annual_reinvestment_cap", self.annual_reinvestment_cap),
            ("one_time_contribution", self.one_time_contribution),
            ("social_security_monthly", self.social_security_monthly),
            ("base_annual_expenses", self.base_annual_expenses),
            ("target_portfolio_value", self.target_portfolio_value),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlanError::NegativeAmount { field, value });
            }
        }

        Ok(())
    }

    /// Years between `current_age` and `target_age`; the projector reports one more point than this.
    pub fn horizon_years(&self) -> u32 {
        self.target_age.saturating_sub(self.current_age)
    }

    pub fn phase_at(&self, age: u32) -> Phase {
        if age < self.withdrawal_start_age {
            Phase::Accumulation
        } else {
            Phase::Withdrawal
        }
    }

    /// Milestone tag for `age`; see [`YearState::milestone`] for how coinciding ages resolve.
    pub fn milestone_at(&self, age: u32) -> Option<Milestone> {
        if age == self.current_age {
            Some(Milestone::CurrentAge)
        } else if age == self.withdrawal_start_age {
            Some(Milestone::WithdrawalStart)
        } else if age == self.social_security_start_age {
            Some(Milestone::SocialSecurityStart)
        } else if age == self.target_age {
            Some(Milestone::TargetAge)
        } else {
            None
        }
    }

    /// Compounded inflation factor for `year_index` years from today.
    pub fn inflation_factor(&self, year_index: u32) -> f64 {
        (1.0 + self.inflation_rate).powi(year_index as i32)
    }
}

/// One modeled year of the cash-flow model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearState {
    pub year: u32,
    pub age: u32,
    pub phase: Phase,
    /// At most one tag per year. Coinciding ages keep the first of current age, withdrawal
    /// start, Social Security start, target age.
    pub milestone: Option<Milestone>,
    pub portfolio_value_start: f64,
    pub portfolio_value_end: f64,
    pub pretax_yield_income: f64,
    pub aftertax_yield_income: f64,
    pub inflated_expenses: f64,
    pub social_security_income: f64,
    pub total_income_aftertax: f64,
    pub net_expenses: f64,
    pub contribution: f64,
    pub reinvestment: f64,
    pub surplus_or_deficit: f64,
    pub annual_return: f64,
    /// Set on the final projector entry: `portfolio_value_end` carries no trailing growth.
    pub closing: bool,
}

pub type SimulationPath = Vec<YearState>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub starting_portfolio: f64,
    pub ending_portfolio: f64,
    pub total_gain: f64,
    pub peak_portfolio: f64,
    pub years_in_accumulation: u32,
    pub years_in_withdrawal: u32,
    pub total_contributions: f64,
    pub total_income_generated: f64,
    pub total_expenses: f64,
    pub success: bool,
    pub ruin_age: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub trajectory: SimulationPath,
    pub summary: ProjectionSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPercentiles {
    pub year: u32,
    pub age: u32,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalValueStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileSummary {
    pub num_paths: u32,
    pub num_years: u32,
    /// Percentage of paths (0-100) whose final value is above zero.
    pub success_rate: f64,
    pub final_value_stats: FinalValueStats,
    pub percentiles_by_year: Vec<YearPercentiles>,
}
