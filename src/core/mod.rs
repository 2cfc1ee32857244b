mod allocation;
mod cashflow;
mod error;
mod expenses;
mod monte_carlo;
mod projector;
mod scenario;
mod stats;
mod types;

pub use allocation::{AllocationTable, AssetClass, BASE_TREASURY_RATE};
pub use cashflow::{Growth, step};
pub use error::{PlanError, PlanResult};
pub use expenses::{RecurringExpense, Recurrence, annual_total};
pub use monte_carlo::{DEFAULT_NUM_PATHS, default_num_years, simulate, simulate_with_rng};
pub use projector::project;
pub use scenario::{
    Comparison, IncomeAnalysis, ScenarioDifferences, ScenarioMetrics, ScenarioOverride,
    ScenarioPreset, ScenarioProjection, ScenarioReport, Timeline, compare, evaluate, presets,
    recommendation, success_score,
};
pub use stats::{mean, percentile, ratio_or_zero};
pub use types::{
    FinalValueStats, Milestone, PercentileSummary, Phase, Projection, ProjectionSummary,
    SimulationParameters, SimulationPath, YearPercentiles, YearState,
};
