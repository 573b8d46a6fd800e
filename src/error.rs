use thiserror::Error;

/// Errors raised by filter construction and by step-time operations that can
/// fail on invalid input (see SPEC_FULL.md §7).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("resampling period must be >= 1, got {0}")]
    InvalidResamplingPeriod(u32),

    #[error("invalid initial HMM distribution: log-sum-exp = {log_sum_exp}, expected ~0")]
    InvalidInitialDistribution { log_sum_exp: f64 },

    #[error("invalid HMM transition row {row}: log-sum-exp = {log_sum_exp}, expected ~0")]
    InvalidTransitionRow { row: usize, log_sum_exp: f64 },

    #[error("invalid scale parameter: {0}")]
    InvalidScale(f64),

    #[error("invalid degrees of freedom: {0}")]
    InvalidDegreesOfFreedom(f64),

    #[error("insufficient degrees of freedom for forecast")]
    InsufficientDegreesOfFreedom,

    #[error("singular covariance matrix encountered")]
    SingularCovariance,
}

pub type Result<T> = std::result::Result<T, FilterError>;
