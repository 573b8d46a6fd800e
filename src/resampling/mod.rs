//! Six interchangeable resampling strategies sharing one contract: take a
//! fixed-size particle array and a fixed-size log-weight array, overwrite
//! both so the new particles are drawn with probability proportional to
//! `exp(log_weight)` and the new log-weights are all zero
//! (`original_source/include/resamplers.h`).

mod fast_multinomial;
mod hilbert;

pub use fast_multinomial::FastMultinomial;
pub use hilbert::HilbertSystematic;

use nalgebra::SVector;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use crate::numerical::normalize_log_weights;

/// Shared contract for all six resampling strategies.
pub trait Resampler<const N: usize, const DX: usize> {
    fn resample(
        &self,
        particles: &mut [SVector<f64, DX>; N],
        log_weights: &mut [f64; N],
        rng: &mut StdRng,
    );
}

/// Cumulative sum of normalized weights, shared by multinomial, residual,
/// stratified and systematic resampling (teacher's `particle_filter.rs`
/// free-function `resample` helper, generalized to const-generic arrays).
fn cumulative_weights<const N: usize>(log_weights: &[f64; N]) -> Vec<f64> {
    let normalized = normalize_log_weights(log_weights);
    let mut acc = 0.0;
    normalized
        .iter()
        .map(|w| {
            acc += w;
            acc
        })
        .collect()
}

fn index_for_uniform(cum_weights: &[f64], u: f64) -> usize {
    cum_weights
        .iter()
        .position(|&c| u <= c)
        .unwrap_or(cum_weights.len() - 1)
}

fn apply_selection<const N: usize, const DX: usize>(
    particles: &mut [SVector<f64, DX>; N],
    log_weights: &mut [f64; N],
    selected_indices: &[usize; N],
) {
    let old = *particles;
    for i in 0..N {
        particles[i] = old[selected_indices[i]];
    }
    *log_weights = [0.0; N];
}

/// Draws N multinomial indices for joint resampling of heterogeneous
/// per-particle state (e.g. an RBPF's `(x2, inner filter)` pairs, which
/// aren't `SVector`s and so can't go through the [`Resampler`] trait
/// directly). Same selection rule as [`Multinomial`].
pub(crate) fn multinomial_indices<const N: usize>(
    log_weights: &[f64; N],
    rng: &mut StdRng,
) -> [usize; N] {
    let cum = cumulative_weights(log_weights);
    let unif = Uniform::new(0.0_f64, 1.0);
    std::array::from_fn(|_| index_for_uniform(&cum, unif.sample(rng)))
}

/// Draw N iid categorical samples with probability proportional to the
/// particles' weights (`resamplers.h`'s `mn_resampler`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Multinomial;

impl<const N: usize, const DX: usize> Resampler<N, DX> for Multinomial {
    fn resample(
        &self,
        particles: &mut [SVector<f64, DX>; N],
        log_weights: &mut [f64; N],
        rng: &mut StdRng,
    ) {
        let cum = cumulative_weights(log_weights);
        let unif = Uniform::new(0.0_f64, 1.0);
        let mut selected = [0usize; N];
        for s in selected.iter_mut() {
            *s = index_for_uniform(&cum, unif.sample(rng));
        }
        apply_selection(particles, log_weights, &selected);
    }
}

/// Deterministic floor copies plus a multinomial draw over the remainder
/// (`resamplers.h`'s `resid_resampler`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Residual;

impl<const N: usize, const DX: usize> Resampler<N, DX> for Residual {
    fn resample(
        &self,
        particles: &mut [SVector<f64, DX>; N],
        log_weights: &mut [f64; N],
        rng: &mut StdRng,
    ) {
        let normalized = normalize_log_weights(log_weights);
        let expected: Vec<f64> = normalized.iter().map(|w| w * N as f64).collect();
        let floors: Vec<usize> = expected.iter().map(|e| e.floor() as usize).collect();
        let deterministic_total: usize = floors.iter().sum();
        let remainder = N - deterministic_total;

        let mut selected = Vec::with_capacity(N);
        for (i, &count) in floors.iter().enumerate() {
            selected.extend(std::iter::repeat(i).take(count));
        }

        if remainder > 0 {
            let fractional: Vec<f64> = expected
                .iter()
                .zip(floors.iter())
                .map(|(e, f)| e - *f as f64)
                .collect();
            let frac_sum: f64 = fractional.iter().sum();
            let cum: Vec<f64> = {
                let mut acc = 0.0;
                fractional
                    .iter()
                    .map(|f| {
                        acc += f / frac_sum;
                        acc
                    })
                    .collect()
            };
            let unif = Uniform::new(0.0_f64, 1.0);
            for _ in 0..remainder {
                selected.push(index_for_uniform(&cum, unif.sample(rng)));
            }
        }

        let mut fixed = [0usize; N];
        fixed.copy_from_slice(&selected[..N]);
        apply_selection(particles, log_weights, &fixed);
    }
}

/// Draw `U_i ~ Uniform(i/N, (i+1)/N)` and invert the weight CDF at each
/// (`resamplers.h`'s `stratif_resampler`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Stratified;

impl<const N: usize, const DX: usize> Resampler<N, DX> for Stratified {
    fn resample(
        &self,
        particles: &mut [SVector<f64, DX>; N],
        log_weights: &mut [f64; N],
        rng: &mut StdRng,
    ) {
        let cum = cumulative_weights(log_weights);
        let unif = Uniform::new(0.0_f64, 1.0);
        let n = N as f64;
        let mut selected = [0usize; N];
        for (i, s) in selected.iter_mut().enumerate() {
            let u = (i as f64 + unif.sample(rng)) / n;
            *s = index_for_uniform(&cum, u);
        }
        apply_selection(particles, log_weights, &selected);
    }
}

/// As stratified, but with one shared draw `U_0 ~ Uniform(0, 1/N)`
/// (`resamplers.h`'s `systematic_resampler`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Systematic;

impl Systematic {
    /// Resample given an externally supplied `u0` instead of drawing one
    /// internally — used by [`HilbertSystematic`] to couple the draw across
    /// time.
    pub fn resample_with_u0<const N: usize, const DX: usize>(
        particles: &mut [SVector<f64, DX>; N],
        log_weights: &mut [f64; N],
        u0: f64,
    ) {
        let cum = cumulative_weights(log_weights);
        let n = N as f64;
        let mut selected = [0usize; N];
        for (i, s) in selected.iter_mut().enumerate() {
            let u = u0 + i as f64 / n;
            *s = index_for_uniform(&cum, u);
        }
        apply_selection(particles, log_weights, &selected);
    }
}

impl<const N: usize, const DX: usize> Resampler<N, DX> for Systematic {
    fn resample(
        &self,
        particles: &mut [SVector<f64, DX>; N],
        log_weights: &mut [f64; N],
        rng: &mut StdRng,
    ) {
        let u0 = Uniform::new(0.0_f64, 1.0 / N as f64).sample(rng);
        Self::resample_with_u0(particles, log_weights, u0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn degenerate_weights<const N: usize>(winner: usize) -> [f64; N] {
        let mut w = [f64::NEG_INFINITY; N];
        w[winner] = 0.0;
        w
    }

    #[test]
    fn multinomial_selectivity() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut particles: [SVector<f64, 3>; 20] = [SVector::zeros(); 20];
        particles[3] = SVector::from([3.0, 3.0, 3.0]);
        let mut weights = degenerate_weights::<20>(3);
        Multinomial.resample(&mut particles, &mut weights, &mut rng);
        for p in particles.iter() {
            assert_eq!(*p, SVector::from([3.0, 3.0, 3.0]));
        }
        assert!(weights.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn stratified_selectivity() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut particles: [SVector<f64, 3>; 20] = [SVector::zeros(); 20];
        particles[7] = SVector::from([3.0, 3.0, 3.0]);
        let mut weights = degenerate_weights::<20>(7);
        Stratified.resample(&mut particles, &mut weights, &mut rng);
        for p in particles.iter() {
            assert_eq!(*p, SVector::from([3.0, 3.0, 3.0]));
        }
        assert!(weights.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn systematic_selectivity() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut particles: [SVector<f64, 3>; 20] = [SVector::zeros(); 20];
        particles[0] = SVector::from([3.0, 3.0, 3.0]);
        let mut weights = degenerate_weights::<20>(0);
        Systematic.resample(&mut particles, &mut weights, &mut rng);
        for p in particles.iter() {
            assert_eq!(*p, SVector::from([3.0, 3.0, 3.0]));
        }
        assert!(weights.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn residual_selectivity() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut particles: [SVector<f64, 3>; 20] = [SVector::zeros(); 20];
        particles[15] = SVector::from([3.0, 3.0, 3.0]);
        let mut weights = degenerate_weights::<20>(15);
        Residual.resample(&mut particles, &mut weights, &mut rng);
        for p in particles.iter() {
            assert_eq!(*p, SVector::from([3.0, 3.0, 3.0]));
        }
        assert!(weights.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn weights_are_all_zero_after_resample_regardless_of_scheme() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut particles: [SVector<f64, 2>; 10] = std::array::from_fn(|i| SVector::from([i as f64, -(i as f64)]));
        let mut weights: [f64; 10] = std::array::from_fn(|i| i as f64 * 0.1);
        Multinomial.resample(&mut particles, &mut weights, &mut rng);
        assert!(weights.iter().all(|&w| w == 0.0));
    }
}
