//! Rao-Blackwellized particle filters (§4.5): the intractable component
//! `x2` is sampled by SMC while the tractable component `x1` is tracked
//! analytically by a closed-form inner filter held one-per-particle
//! (`original_source/include/rbpf.h`).

mod hmm_rbpf;
mod kalman_rbpf;

pub use hmm_rbpf::RbpfHmm;
pub use kalman_rbpf::RbpfKalman;

use nalgebra::{DMatrix, SVector};

use crate::numerical::softmax_shifted;

/// Expectation helper for the RBPF composites: callbacks take both the
/// inner filter's sufficient statistic and the outer `x2` particle
/// (`rbpf.h`'s per-`fs` loop, which calls `h(innerMod.getFilterVec(),
/// x2_sample)`).
pub(crate) fn compute_expectations_rbpf<const N: usize, const SS: usize, const DX2: usize, F>(
    suff_stats: &[SVector<f64, SS>; N],
    x2: &[SVector<f64, DX2>; N],
    log_weights: &[f64; N],
    hs: &[F],
) -> Vec<DMatrix<f64>>
where
    F: Fn(&SVector<f64, SS>, &SVector<f64, DX2>) -> DMatrix<f64>,
{
    let shifted = softmax_shifted(log_weights);
    let denom: f64 = shifted.iter().sum();
    hs.iter()
        .map(|h| {
            let probe = h(&suff_stats[0], &x2[0]);
            let (rows, cols) = probe.shape();
            let mut numer = DMatrix::<f64>::zeros(rows, cols);
            for i in 0..N {
                numer += h(&suff_stats[i], &x2[i]) * shifted[i];
            }
            numer / denom
        })
        .collect()
}
