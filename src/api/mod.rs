use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AllocationTable, PercentileSummary, PlanError, RecurringExpense, ScenarioOverride,
    SimulationParameters, annual_total, compare, default_num_years, presets, project, simulate,
};

/// Upper bound on paths per request; callers budget wall-clock time by path count.
pub const MAX_PATHS: u32 = 50_000;
pub const MAX_YEARS: u32 = 150;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("--paths must be between 1 and {max} (got {0})", max = MAX_PATHS)]
    PathBudget(u32),

    #[error("--years must be between 1 and {max} (got {0})", max = MAX_YEARS)]
    YearBudget(u32),

    #[error("planning horizon must be at most {max} years (got {0})", max = MAX_YEARS)]
    HorizonBudget(u32),

    #[error("server error: {0}")]
    Server(#[source] io::Error),
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Retirement cash-flow projection and Monte Carlo simulator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Deterministic year-by-year projection.
    Project {
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Monte Carlo percentile bands.
    Simulate {
        #[command(flatten)]
        plan: PlanArgs,
        #[arg(long, default_value_t = crate::core::DEFAULT_NUM_PATHS)]
        paths: u32,
        #[arg(long, help = "Years to simulate; defaults to target age minus current age")]
        years: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Compare a JSON scenario override against the configured baseline.
    Compare {
        #[command(flatten)]
        plan: PlanArgs,
        #[arg(long, help = "Scenario override as camelCase JSON")]
        scenario: String,
    },
    /// List the built-in what-if presets.
    Presets {
        #[command(flatten)]
        plan: PlanArgs,
    },
}

/// Baseline configuration. Layering order: built-in defaults, `--config` file,
/// `--expenses-file`, `--treasury-rate`, then individual flags.
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    #[arg(long, help = "JSON file with camelCase parameter overrides")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "JSON list of recurring expenses to annualize")]
    pub expenses_file: Option<PathBuf>,
    #[arg(long, help = "10-year treasury rate in percent; derives yield from the default allocation")]
    pub treasury_rate: Option<f64>,

    #[arg(long, help = "Current net worth")]
    pub starting_portfolio: Option<f64>,
    #[arg(long)]
    pub current_age: Option<u32>,
    #[arg(long)]
    pub withdrawal_start_age: Option<u32>,
    #[arg(long)]
    pub social_security_start_age: Option<u32>,
    #[arg(long)]
    pub target_age: Option<u32>,
    #[arg(long, help = "Inflation in percent")]
    pub inflation_rate: Option<f64>,
    #[arg(long, help = "Expected annual return in percent")]
    pub expected_return: Option<f64>,
    #[arg(long, help = "Annual return volatility in percent")]
    pub return_volatility: Option<f64>,
    #[arg(long, help = "Portfolio yield in percent")]
    pub portfolio_yield: Option<f64>,
    #[arg(long, help = "Tax on yield income in percent")]
    pub tax_rate: Option<f64>,
    #[arg(long)]
    pub annual_reinvestment_cap: Option<f64>,
    #[arg(long)]
    pub one_time_contribution: Option<f64>,
    #[arg(long)]
    pub one_time_contribution_age: Option<u32>,
    #[arg(long)]
    pub social_security_monthly: Option<f64>,
    #[arg(long)]
    pub annual_expenses: Option<f64>,
    #[arg(long)]
    pub target_portfolio_value: Option<f64>,
}

impl PlanArgs {
    fn flag_overrides(&self) -> ScenarioOverride {
        let pct = |v: Option<f64>| v.map(|p| p / 100.0);
        ScenarioOverride {
            starting_portfolio: self.starting_portfolio,
            current_age: self.current_age,
            withdrawal_start_age: self.withdrawal_start_age,
            social_security_start_age: self.social_security_start_age,
            target_age: self.target_age,
            inflation_rate: pct(self.inflation_rate),
            expected_return: pct(self.expected_return),
            return_volatility: pct(self.return_volatility),
            portfolio_yield: pct(self.portfolio_yield),
            tax_rate: pct(self.tax_rate),
            annual_reinvestment_cap: self.annual_reinvestment_cap,
            one_time_contribution: self.one_time_contribution,
            one_time_contribution_age: self.one_time_contribution_age,
            social_security_monthly: self.social_security_monthly,
            base_annual_expenses: self.annual_expenses,
            target_portfolio_value: self.target_portfolio_value,
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

pub fn build_params(args: &PlanArgs) -> Result<SimulationParameters, CliError> {
    let mut params = SimulationParameters::default();

    if let Some(path) = &args.config {
        let file_overrides: ScenarioOverride = read_json(path)?;
        params = file_overrides.apply(&params);
    }
    if let Some(path) = &args.expenses_file {
        let records: Vec<RecurringExpense> = read_json(path)?;
        params.base_annual_expenses = annual_total(&records);
    }
    if let Some(rate) = args.treasury_rate {
        params.portfolio_yield = AllocationTable::default_income().blended_yield(rate / 100.0)?;
    }

    let params = args.flag_overrides().apply(&params);
    params.validate()?;
    check_horizon(&params)?;
    Ok(params)
}

/// Projections allocate one row per year, so the horizon shares the simulator's year budget.
fn check_horizon(params: &SimulationParameters) -> Result<(), CliError> {
    match params.horizon_years() {
        years if years > MAX_YEARS => Err(CliError::HorizonBudget(years)),
        _ => Ok(()),
    }
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Serve { port, plan } => {
            let baseline = build_params(&plan)?;
            run_http_server(port, baseline)
                .await
                .map_err(CliError::Server)
        }
        Command::Project { plan } => {
            let params = build_params(&plan)?;
            print_json(&project(&params)?)
        }
        Command::Simulate {
            plan,
            paths,
            years,
            seed,
        } => {
            let params = build_params(&plan)?;
            if paths == 0 || paths > MAX_PATHS {
                return Err(CliError::PathBudget(paths));
            }
            let years = years.unwrap_or_else(|| default_num_years(&params));
            if years == 0 || years > MAX_YEARS {
                return Err(CliError::YearBudget(years));
            }
            let summary = simulate(&params, paths, years, seed)?;
            print_json(&SimulateResponse::new(params, seed, summary))
        }
        Command::Compare { plan, scenario } => {
            let baseline = build_params(&plan)?;
            let overrides: ScenarioOverride = serde_json::from_str(&scenario)?;
            let candidate = overrides.apply(&baseline);
            check_horizon(&candidate)?;
            print_json(&compare(&baseline, &candidate)?)
        }
        Command::Presets { plan } => {
            let baseline = build_params(&plan)?;
            print_json(&presets(baseline.base_annual_expenses))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulateRequest {
    num_paths: Option<u32>,
    num_years: Option<u32>,
    seed: Option<u64>,
    scenario: ScenarioOverride,
}

/// Flat form of [`SimulateRequest`] for query strings, which cannot carry a nested `scenario`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulateQuery {
    num_paths: Option<u32>,
    num_years: Option<u32>,
    seed: Option<u64>,
    starting_portfolio: Option<f64>,
    current_age: Option<u32>,
    withdrawal_start_age: Option<u32>,
    social_security_start_age: Option<u32>,
    target_age: Option<u32>,
    inflation_rate: Option<f64>,
    expected_return: Option<f64>,
    return_volatility: Option<f64>,
    portfolio_yield: Option<f64>,
    tax_rate: Option<f64>,
    annual_reinvestment_cap: Option<f64>,
    one_time_contribution: Option<f64>,
    one_time_contribution_age: Option<u32>,
    social_security_monthly: Option<f64>,
    base_annual_expenses: Option<f64>,
    target_portfolio_value: Option<f64>,
}

impl From<SimulateQuery> for SimulateRequest {
    fn from(query: SimulateQuery) -> Self {
        Self {
            num_paths: query.num_paths,
            num_years: query.num_years,
            seed: query.seed,
            scenario: ScenarioOverride {
                starting_portfolio: query.starting_portfolio,
                current_age: query.current_age,
                withdrawal_start_age: query.withdrawal_start_age,
                social_security_start_age: query.social_security_start_age,
                target_age: query.target_age,
                inflation_rate: query.inflation_rate,
                expected_return: query.expected_return,
                return_volatility: query.return_volatility,
                portfolio_yield: query.portfolio_yield,
                tax_rate: query.tax_rate,
                annual_reinvestment_cap: query.annual_reinvestment_cap,
                one_time_contribution: query.one_time_contribution,
                one_time_contribution_age: query.one_time_contribution_age,
                social_security_monthly: query.social_security_monthly,
                base_annual_expenses: query.base_annual_expenses,
                target_portfolio_value: query.target_portfolio_value,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    parameters: SimulationParameters,
    seed: Option<u64>,
    #[serde(flatten)]
    summary: PercentileSummary,
}

impl SimulateResponse {
    fn new(parameters: SimulationParameters, seed: Option<u64>, summary: PercentileSummary) -> Self {
        Self {
            parameters,
            seed,
            summary,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type Baseline = Arc<SimulationParameters>;

fn router(baseline: SimulationParameters) -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/compare", post(compare_handler))
        .route("/api/presets", get(presets_handler))
        .fallback(not_found_handler)
        .with_state(Arc::new(baseline))
}

pub async fn run_http_server(port: u16, baseline: SimulationParameters) -> io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(baseline);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    State(baseline): State<Baseline>,
    Query(overrides): Query<ScenarioOverride>,
) -> Response {
    project_handler_impl(&baseline, overrides)
}

async fn project_post_handler(
    State(baseline): State<Baseline>,
    Json(overrides): Json<ScenarioOverride>,
) -> Response {
    project_handler_impl(&baseline, overrides)
}

fn project_handler_impl(baseline: &SimulationParameters, overrides: ScenarioOverride) -> Response {
    let params = overrides.apply(baseline);
    if let Err(e) = check_horizon(&params) {
        return error_response(StatusCode::BAD_REQUEST, &e.to_string());
    }
    match project(&params) {
        Ok(projection) => json_response(StatusCode::OK, projection),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn simulate_get_handler(
    State(baseline): State<Baseline>,
    Query(query): Query<SimulateQuery>,
) -> Response {
    simulate_handler_impl(baseline, query.into()).await
}

async fn simulate_post_handler(
    State(baseline): State<Baseline>,
    Json(request): Json<SimulateRequest>,
) -> Response {
    simulate_handler_impl(baseline, request).await
}

async fn simulate_handler_impl(baseline: Baseline, request: SimulateRequest) -> Response {
    let params = request.scenario.apply(&baseline);
    let num_paths = request.num_paths.unwrap_or(crate::core::DEFAULT_NUM_PATHS);
    if num_paths > MAX_PATHS {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("numPaths must be <= {MAX_PATHS}"),
        );
    }
    let num_years = request
        .num_years
        .unwrap_or_else(|| default_num_years(&params));
    if num_years > MAX_YEARS {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("numYears must be <= {MAX_YEARS}"),
        );
    }
    let seed = request.seed;

    let joined = tokio::task::spawn_blocking(move || {
        simulate(&params, num_paths, num_years, seed)
            .map(|summary| SimulateResponse::new(params, seed, summary))
    })
    .await;

    match joined {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(e)) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        Err(e) => {
            warn!(error = %e, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "simulation failed")
        }
    }
}

async fn compare_handler(
    State(baseline): State<Baseline>,
    Json(overrides): Json<ScenarioOverride>,
) -> Response {
    let candidate = overrides.apply(&baseline);
    if let Err(e) = check_horizon(&candidate) {
        return error_response(StatusCode::BAD_REQUEST, &e.to_string());
    }
    match compare(&baseline, &candidate) {
        Ok(comparison) => json_response(StatusCode::OK, comparison),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn presets_handler(State(baseline): State<Baseline>) -> Response {
    json_response(StatusCode::OK, presets(baseline.base_annual_expenses))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
