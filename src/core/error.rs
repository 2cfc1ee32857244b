use thiserror::Error;

/// Configuration problems detected before any simulation work starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error(
        "ages must satisfy target_age > withdrawal_start_age >= current_age \
         (got current {current_age}, withdrawal {withdrawal_start_age}, target {target_age})"
    )]
    AgeOrdering {
        current_age: u32,
        withdrawal_start_age: u32,
        target_age: u32,
    },

    #[error("number of simulation paths must be > 0")]
    NonPositivePaths,

    #[error("simulation horizon must cover at least one year")]
    EmptyHorizon,

    #[error("{field} must be finite and greater than -100% (got {value})")]
    InvalidRate { field: &'static str, value: f64 },

    #[error("return volatility must be finite and >= 0 (got {0})")]
    InvalidVolatility(f64),

    #[error("{field} must be finite and >= 0 (got {value})")]
    NegativeAmount { field: &'static str, value: f64 },

    #[error("invalid allocation table: {0}")]
    InvalidAllocation(String),
}

pub type PlanResult<T> = Result<T, PlanError>;
