//! Sequential Monte Carlo estimators for partially observed dynamical
//! systems: four interchangeable particle-filter variants (bootstrap, SISR,
//! SISR with common random numbers, auxiliary), six resampling strategies,
//! three closed-form filters usable standalone or as the analytic kernel of
//! a Rao-Blackwellized particle filter, and the shared numerical/config/RNG
//! plumbing they all sit on.

pub mod cf_filters;
pub mod config;
pub mod dists;
pub mod error;
pub mod filters;
pub mod numerical;
pub mod rbpf;
pub mod resampling;
pub mod rng;
pub mod traits;

pub use config::FilterConfig;
pub use error::{FilterError, Result};
