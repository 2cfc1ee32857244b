use super::types::{Phase, SimulationParameters, YearState};

/// How the year's closing value is rolled forward into the next year's start.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Growth {
    /// Compound the post-cash-flow value by this return.
    Apply(f64),
    /// Report the post-cash-flow value as-is (final projector entry).
    Closing,
}

/// One year of the cash-flow model.
///
/// Order matters: yield income is taken on the starting value, the one-time contribution lands
/// before the surplus/deficit is settled, the portfolio is floored at zero, and only then is the
/// market return applied.
pub fn step(
    portfolio_value_start: f64,
    year_index: u32,
    params: &SimulationParameters,
    growth: Growth,
) -> YearState {
    let age = params.current_age + year_index;
    let phase = params.phase_at(age);

    // Social Security rides the same inflation curve as expenses, indexed from year 0.
    let inflation = params.inflation_factor(year_index);
    let inflated_expenses = params.base_annual_expenses * inflation;
    let social_security_income = if age < params.social_security_start_age {
        0.0
    } else {
        params.social_security_monthly * 12.0 * inflation
    };
    let net_expenses = inflated_expenses - social_security_income;

    let pretax_yield_income = portfolio_value_start * params.portfolio_yield;
    let aftertax_yield_income = pretax_yield_income * (1.0 - params.tax_rate);

    let mut portfolio = portfolio_value_start;
    let contribution = if age == params.one_time_contribution_age {
        params.one_time_contribution
    } else {
        0.0
    };
    portfolio += contribution;

    let (reinvestment, surplus_or_deficit) = match phase {
        Phase::Accumulation => (0.0, aftertax_yield_income),
        Phase::Withdrawal => settle_withdrawal_year(
            &mut portfolio,
            aftertax_yield_income,
            net_expenses,
            params.annual_reinvestment_cap,
        ),
    };

    // Ruin is absorbing: the portfolio never goes below zero.
    portfolio = portfolio.max(0.0);

    let (portfolio_value_end, annual_return, closing) = match growth {
        Growth::Apply(rate) => ((portfolio * (1.0 + rate)).max(0.0), rate, false),
        Growth::Closing => (portfolio, 0.0, true),
    };

    YearState {
        year: year_index,
        age,
        phase,
        milestone: params.milestone_at(age),
        portfolio_value_start,
        portfolio_value_end,
        pretax_yield_income,
        aftertax_yield_income,
        inflated_expenses,
        social_security_income,
        total_income_aftertax: aftertax_yield_income + social_security_income,
        net_expenses,
        contribution,
        reinvestment,
        surplus_or_deficit,
        annual_return,
        closing,
    }
}

/// Returns `(reinvestment, surplus_or_deficit)` and applies the reinvestment or drawdown.
fn settle_withdrawal_year(
    portfolio: &mut f64,
    aftertax_yield_income: f64,
    net_expenses: f64,
    reinvestment_cap: f64,
) -> (f64, f64) {
    let raw_surplus = aftertax_yield_income - net_expenses;
    if raw_surplus > 0.0 {
        let reinvestment = reinvestment_cap.min(raw_surplus);
        *portfolio += reinvestment;
        (reinvestment, raw_surplus - reinvestment)
    } else {
        *portfolio -= raw_surplus.abs();
        (0.0, raw_surplus)
    }
}
