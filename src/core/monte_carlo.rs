use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info};

use super::cashflow::{Growth, step};
use super::error::{PlanError, PlanResult};
use super::stats::{mean, percentile_sorted};
use super::types::{FinalValueStats, PercentileSummary, SimulationParameters, YearPercentiles};

pub const DEFAULT_NUM_PATHS: u32 = 1_000;
const PROGRESS_INTERVAL: u32 = 1_000;

/// Years simulated when the caller does not choose a horizon: current age up to (excluding) target age.
pub fn default_num_years(params: &SimulationParameters) -> u32 {
    params.horizon_years()
}

#[derive(Debug, Clone)]
struct PathOutcome {
    starts: Vec<f64>,
    final_value: f64,
}

/// Runs `num_paths` independent paths in parallel. Each path draws from its own ChaCha stream
/// derived from `seed` (or a fresh random seed), so a seeded run is reproducible regardless of
/// how rayon schedules the work.
pub fn simulate(
    params: &SimulationParameters,
    num_paths: u32,
    num_years: u32,
    seed: Option<u64>,
) -> PlanResult<PercentileSummary> {
    let returns = prepare_run(params, num_paths, num_years)?;
    let base_seed = seed.unwrap_or_else(|| rand::rng().random());
    info!(
        num_paths,
        num_years,
        seed = base_seed,
        expected_return = params.expected_return,
        volatility = params.return_volatility,
        "running Monte Carlo simulation"
    );

    let completed = AtomicU32::new(0);
    let outcomes = (0..num_paths)
        .into_par_iter()
        .map(|path_id| {
            let mut rng = ChaCha20Rng::seed_from_u64(derive_seed(base_seed, path_id));
            let outcome = run_path(params, num_years, &returns, &mut rng);
            tick_progress(&completed);
            outcome
        })
        .collect::<Vec<_>>();

    let summary = aggregate(params, num_years, &outcomes);
    info!(
        success_rate = summary.success_rate,
        median_final = summary.final_value_stats.median,
        "Monte Carlo simulation complete"
    );
    Ok(summary)
}

/// Sequential variant drawing every path from the caller's generator.
pub fn simulate_with_rng<R: Rng + ?Sized>(
    params: &SimulationParameters,
    num_paths: u32,
    num_years: u32,
    rng: &mut R,
) -> PlanResult<PercentileSummary> {
    let returns = prepare_run(params, num_paths, num_years)?;
    info!(num_paths, num_years, "running Monte Carlo simulation");

    let mut outcomes = Vec::with_capacity(num_paths as usize);
    for path_id in 1..=num_paths {
        outcomes.push(run_path(params, num_years, &returns, rng));
        if path_id % PROGRESS_INTERVAL == 0 {
            debug!(paths_done = path_id, "Monte Carlo progress");
        }
    }

    Ok(aggregate(params, num_years, &outcomes))
}

/// Counts one finished path; returns the running total when it lands on a progress line.
fn tick_progress(completed: &AtomicU32) -> Option<u32> {
    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
    if done % PROGRESS_INTERVAL == 0 {
        debug!(paths_done = done, "Monte Carlo progress");
        Some(done)
    } else {
        None
    }
}

fn prepare_run(
    params: &SimulationParameters,
    num_paths: u32,
    num_years: u32,
) -> PlanResult<Normal<f64>> {
    params.validate()?;
    if num_paths == 0 {
        return Err(PlanError::NonPositivePaths);
    }
    if num_years == 0 {
        return Err(PlanError::EmptyHorizon);
    }
    Normal::new(params.expected_return, params.return_volatility)
        .map_err(|_| PlanError::InvalidVolatility(params.return_volatility))
}

fn run_path<R: Rng + ?Sized>(
    params: &SimulationParameters,
    num_years: u32,
    returns: &Normal<f64>,
    rng: &mut R,
) -> PathOutcome {
    let mut starts = Vec::with_capacity(num_years as usize);
    let mut portfolio = params.starting_portfolio;
    for year_index in 0..num_years {
        let rate = returns.sample(rng);
        let state = step(portfolio, year_index, params, Growth::Apply(rate));
        starts.push(state.portfolio_value_start);
        portfolio = state.portfolio_value_end;
    }
    PathOutcome {
        starts,
        final_value: portfolio,
    }
}

fn aggregate(
    params: &SimulationParameters,
    num_years: u32,
    outcomes: &[PathOutcome],
) -> PercentileSummary {
    let mut columns = vec![Vec::with_capacity(outcomes.len()); num_years as usize];
    for outcome in outcomes {
        for (idx, value) in outcome.starts.iter().enumerate() {
            columns[idx].push(*value);
        }
    }

    let percentiles_by_year = columns
        .iter_mut()
        .enumerate()
        .map(|(idx, values)| {
            values.sort_by(|a, b| a.total_cmp(b));
            YearPercentiles {
                year: idx as u32,
                age: params.current_age + idx as u32,
                p10: percentile_sorted(values, 10.0),
                p25: percentile_sorted(values, 25.0),
                p50: percentile_sorted(values, 50.0),
                p75: percentile_sorted(values, 75.0),
                p90: percentile_sorted(values, 90.0),
                mean: mean(values),
            }
        })
        .collect();

    let mut finals = outcomes.iter().map(|o| o.final_value).collect::<Vec<_>>();
    finals.sort_by(|a, b| a.total_cmp(b));
    let successes = finals.iter().filter(|v| **v > 0.0).count();

    PercentileSummary {
        num_paths: outcomes.len() as u32,
        num_years,
        success_rate: successes as f64 / outcomes.len() as f64 * 100.0,
        final_value_stats: FinalValueStats {
            mean: mean(&finals),
            median: percentile_sorted(&finals, 50.0),
            min: finals.first().copied().unwrap_or(0.0),
            max: finals.last().copied().unwrap_or(0.0),
            p10: percentile_sorted(&finals, 10.0),
            p90: percentile_sorted(&finals, 90.0),
        },
        percentiles_by_year,
    }
}

fn derive_seed(base_seed: u64, path_id: u32) -> u64 {
    splitmix64(base_seed ^ ((path_id as u64) << 32) ^ path_id as u64)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
