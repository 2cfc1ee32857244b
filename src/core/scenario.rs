use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::PlanResult;
use super::projector::project;
use super::stats::ratio_or_zero;
use super::types::SimulationParameters;

/// Partial override of [`SimulationParameters`]; unset fields fall back to the baseline.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioOverride {
    pub starting_portfolio: Option<f64>,
    pub current_age: Option<u32>,
    pub withdrawal_start_age: Option<u32>,
    pub social_security_start_age: Option<u32>,
    pub target_age: Option<u32>,
    pub inflation_rate: Option<f64>,
    pub expected_return: Option<f64>,
    pub return_volatility: Option<f64>,
    pub portfolio_yield: Option<f64>,
    pub tax_rate: Option<f64>,
    pub annual_reinvestment_cap: Option<f64>,
    pub one_time_contribution: Option<f64>,
    pub one_time_contribution_age: Option<u32>,
    pub social_security_monthly: Option<f64>,
    pub base_annual_expenses: Option<f64>,
    pub target_portfolio_value: Option<f64>,
}

impl ScenarioOverride {
    pub fn apply(&self, baseline: &SimulationParameters) -> SimulationParameters {
        SimulationParameters {
            starting_portfolio: self.starting_portfolio.unwrap_or(baseline.starting_portfolio),
            current_age: self.current_age.unwrap_or(baseline.current_age),
            withdrawal_start_age: self
                .withdrawal_start_age
                .unwrap_or(baseline.withdrawal_start_age),
            social_security_start_age: self
                .social_security_start_age
                .unwrap_or(baseline.social_security_start_age),
            target_age: self.target_age.unwrap_or(baseline.target_age),
            inflation_rate: self.inflation_rate.unwrap_or(baseline.inflation_rate),
            expected_return: self.expected_return.unwrap_or(baseline.expected_return),
            return_volatility: self.return_volatility.unwrap_or(baseline.return_volatility),
            portfolio_yield: self.portfolio_yield.unwrap_or(baseline.portfolio_yield),
            tax_rate: self.tax_rate.unwrap_or(baseline.tax_rate),
            annual_reinvestment_cap: self
                .annual_reinvestment_cap
                .unwrap_or(baseline.annual_reinvestment_cap),
            one_time_contribution: self
                .one_time_contribution
                .unwrap_or(baseline.one_time_contribution),
            one_time_contribution_age: self
                .one_time_contribution_age
                .unwrap_or(baseline.one_time_contribution_age),
            social_security_monthly: self
                .social_security_monthly
                .unwrap_or(baseline.social_security_monthly),
            base_annual_expenses: self
                .base_annual_expenses
                .unwrap_or(baseline.base_annual_expenses),
            target_portfolio_value: self
                .target_portfolio_value
                .unwrap_or(baseline.target_portfolio_value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub years_to_withdrawal: i64,
    pub years_in_retirement: i64,
    pub years_before_social_security: i64,
    pub years_with_social_security: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeAnalysis {
    pub annual_yield_income: f64,
    pub expenses_at_withdrawal: f64,
    pub income_gap_before_ss: f64,
    pub expenses_at_ss_start: f64,
    pub social_security_annual: f64,
    pub net_expenses_with_ss: f64,
    pub income_gap_after_ss: f64,
    pub income_sufficient_before_ss: bool,
    pub income_sufficient_after_ss: bool,
    pub required_yield_before_ss: f64,
    pub required_yield_after_ss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioProjection {
    pub portfolio_at_withdrawal: f64,
    pub final_portfolio_value: f64,
    pub surplus_vs_target: f64,
    pub target_met: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMetrics {
    pub progress_to_target_percentage: f64,
    pub required_growth_rate: f64,
    pub success_score: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub inputs: SimulationParameters,
    pub timeline: Timeline,
    pub income_analysis: IncomeAnalysis,
    pub projection: ScenarioProjection,
    pub metrics: ScenarioMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDifferences {
    pub final_portfolio_value: f64,
    pub income_gap_before_ss: f64,
    pub success_score: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub scenario: ScenarioReport,
    pub baseline: ScenarioReport,
    pub differences: ScenarioDifferences,
    pub recommendation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioPreset {
    pub name: &'static str,
    pub description: &'static str,
    pub scenario: ScenarioOverride,
}

/// Runs the deterministic projector for `params` and derives the income and target metrics.
pub fn evaluate(params: &SimulationParameters) -> PlanResult<ScenarioReport> {
    let projection = project(params)?;

    let current = params.current_age as i64;
    let withdrawal = params.withdrawal_start_age as i64;
    let ss_start = params.social_security_start_age as i64;
    let target = params.target_age as i64;
    let timeline = Timeline {
        years_to_withdrawal: withdrawal - current,
        years_in_retirement: target - withdrawal,
        years_before_social_security: ss_start - withdrawal,
        years_with_social_security: target - ss_start,
    };

    let indexed = |amount: f64, years: i64| amount * (1.0 + params.inflation_rate).powi(years as i32);
    let annual_yield_income = params.starting_portfolio * params.portfolio_yield;
    let expenses_at_withdrawal = indexed(params.base_annual_expenses, timeline.years_to_withdrawal);
    let expenses_at_ss_start = indexed(params.base_annual_expenses, ss_start - current);
    let social_security_annual = indexed(params.social_security_monthly * 12.0, ss_start - current);
    let net_expenses_with_ss = expenses_at_ss_start - social_security_annual;

    let income_analysis = IncomeAnalysis {
        annual_yield_income,
        expenses_at_withdrawal,
        income_gap_before_ss: expenses_at_withdrawal - annual_yield_income,
        expenses_at_ss_start,
        social_security_annual,
        net_expenses_with_ss,
        income_gap_after_ss: net_expenses_with_ss - annual_yield_income,
        income_sufficient_before_ss: annual_yield_income >= expenses_at_withdrawal,
        income_sufficient_after_ss: net_expenses_with_ss <= 0.0
            || annual_yield_income >= net_expenses_with_ss,
        required_yield_before_ss: ratio_or_zero(expenses_at_withdrawal, params.starting_portfolio),
        required_yield_after_ss: ratio_or_zero(net_expenses_with_ss, params.starting_portfolio),
    };

    let portfolio_at_withdrawal = projection
        .trajectory
        .iter()
        .find(|s| s.age == params.withdrawal_start_age)
        .map(|s| s.portfolio_value_start)
        .unwrap_or(params.starting_portfolio);
    let final_portfolio_value = projection.summary.ending_portfolio;
    let target_met = final_portfolio_value >= params.target_portfolio_value;

    let years_to_target = params.horizon_years();
    let required_growth_rate = if params.starting_portfolio > 0.0 && years_to_target > 0 {
        (params.target_portfolio_value / params.starting_portfolio).powf(1.0 / years_to_target as f64)
            - 1.0
    } else {
        0.0
    };

    let metrics = ScenarioMetrics {
        progress_to_target_percentage: ratio_or_zero(
            params.starting_portfolio,
            params.target_portfolio_value,
        ) * 100.0,
        required_growth_rate,
        success_score: success_score(
            income_analysis.income_sufficient_before_ss,
            income_analysis.income_sufficient_after_ss,
            target_met,
        ),
    };

    Ok(ScenarioReport {
        inputs: params.clone(),
        timeline,
        income_analysis,
        projection: ScenarioProjection {
            portfolio_at_withdrawal,
            final_portfolio_value,
            surplus_vs_target: final_portfolio_value - params.target_portfolio_value,
            target_met,
        },
        metrics,
    })
}

pub fn compare(
    baseline: &SimulationParameters,
    scenario: &SimulationParameters,
) -> PlanResult<Comparison> {
    let scenario_report = evaluate(scenario)?;
    let baseline_report = evaluate(baseline)?;

    let differences = ScenarioDifferences {
        final_portfolio_value: scenario_report.projection.final_portfolio_value
            - baseline_report.projection.final_portfolio_value,
        income_gap_before_ss: scenario_report.income_analysis.income_gap_before_ss
            - baseline_report.income_analysis.income_gap_before_ss,
        success_score: scenario_report.metrics.success_score as i64
            - baseline_report.metrics.success_score as i64,
    };
    let recommendation = recommendation(scenario_report.metrics.success_score);

    info!(
        scenario_score = scenario_report.metrics.success_score,
        baseline_score = baseline_report.metrics.success_score,
        final_value_diff = differences.final_portfolio_value,
        "scenario comparison complete"
    );

    Ok(Comparison {
        scenario: scenario_report,
        baseline: baseline_report,
        differences,
        recommendation,
    })
}

/// 0-100: income covers expenses before Social Security (40), after it (30), target met (30).
pub fn success_score(income_before_ss: bool, income_after_ss: bool, target_met: bool) -> u32 {
    let mut score = 0;
    if income_before_ss {
        score += 40;
    }
    if income_after_ss {
        score += 30;
    }
    if target_met {
        score += 30;
    }
    score
}

pub fn recommendation(score: u32) -> &'static str {
    match score {
        90.. => "Excellent scenario! All retirement goals are met with this configuration.",
        70..=89 => {
            "Good scenario. Most goals are achievable, but consider increasing income or reducing expenses."
        }
        50..=69 => "Moderate concerns. Significant adjustments needed to meet retirement goals.",
        _ => "High risk scenario. Major changes required to achieve financial security in retirement.",
    }
}

pub fn presets(baseline_expenses: f64) -> Vec<ScenarioPreset> {
    vec![
        ScenarioPreset {
            name: "Conservative (3% growth, 2.5% yield)",
            description: "Lower return assumptions for market downturns",
            scenario: ScenarioOverride {
                expected_return: Some(0.03),
                portfolio_yield: Some(0.025),
                inflation_rate: Some(0.035),
                ..ScenarioOverride::default()
            },
        },
        ScenarioPreset {
            name: "Optimistic (8% growth, 4.5% yield)",
            description: "Higher returns in favorable market conditions",
            scenario: ScenarioOverride {
                expected_return: Some(0.08),
                portfolio_yield: Some(0.045),
                inflation_rate: Some(0.025),
                ..ScenarioOverride::default()
            },
        },
        ScenarioPreset {
            name: "Retire Earlier (Age 53)",
            description: "Retire 2 years earlier than planned",
            scenario: ScenarioOverride {
                withdrawal_start_age: Some(53),
                ..ScenarioOverride::default()
            },
        },
        ScenarioPreset {
            name: "Retire Later (Age 60)",
            description: "Delay retirement for more growth",
            scenario: ScenarioOverride {
                withdrawal_start_age: Some(60),
                ..ScenarioOverride::default()
            },
        },
        ScenarioPreset {
            name: "Higher Expenses (+25%)",
            description: "Test with 25% higher annual expenses",
            scenario: ScenarioOverride {
                base_annual_expenses: Some(baseline_expenses * 1.25),
                ..ScenarioOverride::default()
            },
        },
        ScenarioPreset {
            name: "Lower Expenses (-25%)",
            description: "Test with 25% lower annual expenses",
            scenario: ScenarioOverride {
                base_annual_expenses: Some(baseline_expenses * 0.75),
                ..ScenarioOverride::default()
            },
        },
    ]
}
