//! O(N) multinomial resampling via exponential-spacing order statistics
//! (`original_source/include/resamplers.h`'s `mn_resamp_fast1`).

use nalgebra::SVector;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp1};

use super::{apply_selection, cumulative_weights, Resampler};

#[derive(Debug, Default, Clone, Copy)]
pub struct FastMultinomial;

impl<const N: usize, const DX: usize> Resampler<N, DX> for FastMultinomial {
    fn resample(
        &self,
        particles: &mut [SVector<f64, DX>; N],
        log_weights: &mut [f64; N],
        rng: &mut StdRng,
    ) {
        let cum_weights = cumulative_weights(log_weights);

        // N+1 exponential spacings; their partial sums normalized by the
        // total are the order statistics of N iid Uniform(0,1) draws.
        let exps: Vec<f64> = (0..=N).map(|_| rng.sample(Exp1)).collect();
        let total: f64 = exps.iter().sum();

        let mut order_stats = Vec::with_capacity(N);
        let mut acc = 0.0;
        for e in exps.iter().take(N) {
            acc += e;
            order_stats.push(acc / total);
        }

        // Single pass: walk the sorted uniform order statistics against the
        // cumulative normalized weights. The reference code's inner-loop
        // predicate is a mis-parsed chained comparison (see DESIGN.md); this
        // implements the intended conjunction `a < u <= b`.
        let mut selected = [0usize; N];
        let mut weight_idx = 0usize;
        for (i, &u) in order_stats.iter().enumerate() {
            while weight_idx + 1 < N
                && !(weight_idx_lower(&cum_weights, weight_idx) < u && u <= cum_weights[weight_idx])
            {
                weight_idx += 1;
            }
            selected[i] = weight_idx;
        }

        apply_selection(particles, log_weights, &selected);
    }
}

fn weight_idx_lower(cum_weights: &[f64], idx: usize) -> f64 {
    if idx == 0 {
        0.0
    } else {
        cum_weights[idx - 1]
    }
}
