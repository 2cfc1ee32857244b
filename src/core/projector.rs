use tracing::{debug, info};

use super::cashflow::{Growth, step};
use super::error::PlanResult;
use super::types::{Phase, Projection, ProjectionSummary, SimulationParameters, YearState};

/// Deterministic year-by-year projection from `current_age` to `target_age` inclusive.
///
/// Every year compounds at `expected_return` except the last, which is reported as a closing
/// snapshot so the final value reflects end-of-horizon wealth.
pub fn project(params: &SimulationParameters) -> PlanResult<Projection> {
    params.validate()?;

    let years = params.horizon_years();
    info!(
        current_age = params.current_age,
        target_age = params.target_age,
        starting_portfolio = params.starting_portfolio,
        "running deterministic projection"
    );

    let mut trajectory = Vec::with_capacity(years as usize + 1);
    let mut portfolio = params.starting_portfolio;
    for year_index in 0..=years {
        let growth = if year_index < years {
            Growth::Apply(params.expected_return)
        } else {
            Growth::Closing
        };
        let state = step(portfolio, year_index, params, growth);
        portfolio = state.portfolio_value_end;
        trajectory.push(state);
    }

    let summary = summarize(params, &trajectory);
    info!(
        ending_portfolio = summary.ending_portfolio,
        success = summary.success,
        "deterministic projection complete"
    );

    Ok(Projection {
        trajectory,
        summary,
    })
}

fn summarize(params: &SimulationParameters, trajectory: &[YearState]) -> ProjectionSummary {
    let ending_portfolio = trajectory
        .last()
        .map(|s| s.portfolio_value_end)
        .unwrap_or(params.starting_portfolio);
    let peak_portfolio = trajectory
        .iter()
        .map(|s| s.portfolio_value_start)
        .fold(ending_portfolio, f64::max);

    let withdrawal_years = || trajectory.iter().filter(|s| s.phase == Phase::Withdrawal);
    let years_in_withdrawal = withdrawal_years().count() as u32;

    let ruin_age = trajectory
        .iter()
        .find(|s| s.portfolio_value_end <= 0.0)
        .map(|s| s.age);
    if let Some(age) = ruin_age {
        debug!(age, "portfolio exhausted");
    }

    ProjectionSummary {
        starting_portfolio: params.starting_portfolio,
        ending_portfolio,
        total_gain: ending_portfolio - params.starting_portfolio,
        peak_portfolio,
        years_in_accumulation: trajectory.len() as u32 - years_in_withdrawal,
        years_in_withdrawal,
        total_contributions: trajectory.iter().map(|s| s.contribution).sum(),
        total_income_generated: withdrawal_years().map(|s| s.total_income_aftertax).sum(),
        total_expenses: withdrawal_years().map(|s| s.net_expenses).sum(),
        success: ending_portfolio > 0.0,
        ruin_age,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PlanError;
    use crate::core::types::Milestone;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_params() -> SimulationParameters {
        SimulationParameters {
            starting_portfolio: 1_200_000.0,
            social_security_monthly: 3_000.0,
            base_annual_expenses: 60_000.0,
            ..SimulationParameters::default()
        }
    }

    fn compounding_only_params() -> SimulationParameters {
        SimulationParameters {
            starting_portfolio: 100_000.0,
            current_age: 51,
            withdrawal_start_age: 55,
            social_security_start_age: 200,
            target_age: 56,
            inflation_rate: 0.0,
            expected_return: 0.06,
            return_volatility: 0.0,
            portfolio_yield: 0.0,
            tax_rate: 0.0,
            annual_reinvestment_cap: 0.0,
            one_time_contribution: 0.0,
            one_time_contribution_age: 200,
            social_security_monthly: 0.0,
            base_annual_expenses: 0.0,
            target_portfolio_value: 0.0,
        }
    }

    #[test]
    fn trajectory_covers_both_endpoints() {
        let params = sample_params();
        let projection = project(&params).expect("valid params");
        assert_eq!(projection.trajectory.len(), 40);
        assert_eq!(projection.trajectory[0].age, 51);
        assert_eq!(projection.trajectory[39].age, 90);
    }

    #[test]
    fn pure_compounding_matches_hand_computed_values() {
        let projection = project(&compounding_only_params()).expect("valid params");
        let t = &projection.trajectory;
        assert_approx(t[0].portfolio_value_end, 106_000.0);
        assert_approx(t[1].portfolio_value_start, 106_000.0);
        assert_approx(t[1].portfolio_value_end, 112_360.0);
        assert_approx(t[5].portfolio_value_start, 100_000.0 * 1.06_f64.powi(5));
        assert_approx(t[5].portfolio_value_end, t[5].portfolio_value_start);
    }

    #[test]
    fn only_final_entry_is_a_closing_snapshot() {
        let projection = project(&sample_params()).expect("valid params");
        let (last, rest) = projection.trajectory.split_last().expect("non-empty");
        assert!(last.closing);
        assert!(rest.iter().all(|s| !s.closing));
        assert_approx(
            projection.summary.ending_portfolio,
            last.portfolio_value_end,
        );
    }

    #[test]
    fn milestones_tag_notable_ages() {
        let projection = project(&sample_params()).expect("valid params");
        let tagged = projection
            .trajectory
            .iter()
            .filter_map(|s| s.milestone.map(|m| (s.age, m)))
            .collect::<Vec<_>>();
        assert_eq!(
            tagged,
            vec![
                (51, Milestone::CurrentAge),
                (55, Milestone::WithdrawalStart),
                (67, Milestone::SocialSecurityStart),
                (90, Milestone::TargetAge),
            ]
        );
    }

    #[test]
    fn coinciding_milestones_keep_the_earliest_tag() {
        let mut params = sample_params();
        params.withdrawal_start_age = params.current_age;
        params.social_security_start_age = params.target_age;
        let projection = project(&params).expect("valid params");
        let tagged = projection
            .trajectory
            .iter()
            .filter_map(|s| s.milestone.map(|m| (s.age, m)))
            .collect::<Vec<_>>();
        assert_eq!(
            tagged,
            vec![(51, Milestone::CurrentAge), (90, Milestone::SocialSecurityStart)]
        );
    }

    #[test]
    fn summary_aggregates_withdrawal_phase_flows() {
        let params = sample_params();
        let projection = project(&params).expect("valid params");
        let summary = &projection.summary;

        assert_eq!(summary.years_in_accumulation, 4);
        assert_eq!(summary.years_in_withdrawal, 36);
        assert_approx(summary.total_contributions, 250_000.0);
        assert_approx(summary.starting_portfolio, 1_200_000.0);

        let expected_expenses: f64 = projection
            .trajectory
            .iter()
            .filter(|s| s.age >= 55)
            .map(|s| s.net_expenses)
            .sum();
        assert_approx(summary.total_expenses, expected_expenses);
        assert!(summary.peak_portfolio >= summary.starting_portfolio);
        assert_eq!(summary.success, summary.ending_portfolio > 0.0);
    }

    #[test]
    fn ruinous_plan_reports_first_zero_age() {
        let mut params = sample_params();
        params.starting_portfolio = 100_000.0;
        params.one_time_contribution = 0.0;
        params.social_security_monthly = 0.0;
        params.base_annual_expenses = 90_000.0;

        let projection = project(&params).expect("valid params");
        assert!(!projection.summary.success);
        let ruin_age = projection.summary.ruin_age.expect("plan must run out");
        assert!(ruin_age >= 55 && ruin_age < 60);
        assert!(
            projection
                .trajectory
                .iter()
                .filter(|s| s.age > ruin_age)
                .all(|s| s.portfolio_value_start == 0.0)
        );
    }

    #[test]
    fn immediate_withdrawal_starts_in_withdrawal_phase() {
        let mut params = sample_params();
        params.withdrawal_start_age = params.current_age;
        let projection = project(&params).expect("valid params");
        assert_eq!(projection.trajectory[0].phase, Phase::Withdrawal);
        assert_eq!(projection.summary.years_in_accumulation, 0);
    }

    #[test]
    fn rejects_out_of_order_ages_before_running() {
        let mut params = sample_params();
        params.target_age = params.withdrawal_start_age;
        let err = project(&params).expect_err("must reject");
        assert!(matches!(err, PlanError::AgeOrdering { .. }));

        let mut params = sample_params();
        params.withdrawal_start_age = params.current_age - 1;
        assert!(project(&params).is_err());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_projection_is_full_length_and_never_negative(
            current_age in 20u32..70,
            to_withdrawal in 0u32..20,
            to_target in 1u32..40,
            ss_offset in 0u32..40,
            starting in 0u32..3_000_000,
            expenses in 0u32..250_000,
            ss_monthly in 0u32..5_000,
            return_bp in -3000i32..2000,
            yield_bp in 0u32..1200,
            inflation_bp in 0u32..800,
            tax_bp in 0u32..5000
        ) {
            let params = SimulationParameters {
                starting_portfolio: starting as f64,
                current_age,
                withdrawal_start_age: current_age + to_withdrawal,
                social_security_start_age: current_age + ss_offset,
                target_age: current_age + to_withdrawal + to_target,
                inflation_rate: inflation_bp as f64 / 10_000.0,
                expected_return: return_bp as f64 / 10_000.0,
                return_volatility: 0.0,
                portfolio_yield: yield_bp as f64 / 10_000.0,
                tax_rate: tax_bp as f64 / 10_000.0,
                annual_reinvestment_cap: 20_000.0,
                one_time_contribution: 50_000.0,
                one_time_contribution_age: current_age + to_withdrawal / 2,
                social_security_monthly: ss_monthly as f64,
                base_annual_expenses: expenses as f64,
                target_portfolio_value: 1_000_000.0,
            };

            let projection = project(&params).expect("generated params are valid");
            prop_assert_eq!(
                projection.trajectory.len() as u32,
                params.target_age - params.current_age + 1
            );
            for state in &projection.trajectory {
                prop_assert!(state.portfolio_value_start >= 0.0);
                prop_assert!(state.portfolio_value_end >= 0.0);
            }
        }
    }
}
