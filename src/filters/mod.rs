//! The four particle-filter variants (SPEC_FULL.md §4.1-4.4), sharing the
//! same observational interface: advance one step, read back the log
//! conditional likelihood and the cached expectations.

mod auxiliary;
mod bootstrap;
mod bootstrap_cov;
mod crn;
mod sisr;

pub use auxiliary::ApfFilter;
pub use bootstrap::BootstrapFilter;
pub use bootstrap_cov::BootstrapFilterCov;
pub use crn::CrnFilter;
pub use sisr::SisrFilter;

use nalgebra::{DMatrix, SVector};

use crate::numerical::softmax_shifted;

/// Shared expectation-computation helper: discover each callback's output
/// shape from particle 0, then accumulate a weighted average via
/// shift-by-max (`original_source/include/bootstrap_filter.h`'s per-`fs`
/// loop, generalized across all four variants).
pub(crate) fn compute_expectations<const N: usize, const DX: usize, F>(
    particles: &[SVector<f64, DX>; N],
    log_weights: &[f64; N],
    hs: &[F],
) -> Vec<DMatrix<f64>>
where
    F: Fn(&SVector<f64, DX>) -> DMatrix<f64>,
{
    let shifted = softmax_shifted(log_weights);
    let denom: f64 = shifted.iter().sum();
    hs.iter()
        .map(|h| {
            let probe = h(&particles[0]);
            let (rows, cols) = probe.shape();
            let mut numer = DMatrix::<f64>::zeros(rows, cols);
            for i in 0..N {
                numer += h(&particles[i]) * shifted[i];
            }
            numer / denom
        })
        .collect()
}

/// As [`compute_expectations`], but for the covariate-aware bootstrap
/// variant: each callback also takes the current step's covariate `z_t`.
pub(crate) fn compute_expectations_cov<const N: usize, const DX: usize, const DCOV: usize, F>(
    particles: &[SVector<f64, DX>; N],
    z: &SVector<f64, DCOV>,
    log_weights: &[f64; N],
    hs: &[F],
) -> Vec<DMatrix<f64>>
where
    F: Fn(&SVector<f64, DX>, &SVector<f64, DCOV>) -> DMatrix<f64>,
{
    let shifted = softmax_shifted(log_weights);
    let denom: f64 = shifted.iter().sum();
    hs.iter()
        .map(|h| {
            let probe = h(&particles[0], z);
            let (rows, cols) = probe.shape();
            let mut numer = DMatrix::<f64>::zeros(rows, cols);
            for i in 0..N {
                numer += h(&particles[i], z) * shifted[i];
            }
            numer / denom
        })
        .collect()
}
