use nalgebra::{DMatrix, SVector};
use rand::rngs::StdRng;

use crate::config::FilterConfig;
use crate::numerical::log_sum_exp;
use crate::resampling::Resampler;
use crate::rng::seeded_rng;
use crate::traits::BootstrapModel;

use super::compute_expectations;

/// Bootstrap particle filter (§4.1): the prior transition doubles as the
/// proposal, so the weight update at every step is just `log g(y_t|x_t)`
/// (`original_source/include/bootstrap_filter.h`'s `BSFilter`).
pub struct BootstrapFilter<M, R, const N: usize, const DX: usize, const DY: usize> {
    model: M,
    resampler: R,
    config: FilterConfig,
    rng: StdRng,
    t: u64,
    particles: [SVector<f64, DX>; N],
    log_weights: [f64; N],
    log_cond_like: f64,
    expectations: Vec<DMatrix<f64>>,
}

impl<M, R, const N: usize, const DX: usize, const DY: usize> BootstrapFilter<M, R, N, DX, DY>
where
    M: BootstrapModel<DX, DY>,
    R: Resampler<N, DX>,
{
    pub fn new(model: M, resampler: R, config: FilterConfig) -> Self {
        let rng = seeded_rng(config.seed);
        Self {
            model,
            resampler,
            config,
            rng,
            t: 0,
            particles: [SVector::zeros(); N],
            log_weights: [0.0; N],
            log_cond_like: 0.0,
            expectations: Vec::new(),
        }
    }

    /// Advances the filter with one new observation. `hs` are expectation
    /// callbacks; pass an empty slice if you only need the likelihood.
    pub fn filter<F>(&mut self, y: &SVector<f64, DY>, hs: &[F])
    where
        F: Fn(&SVector<f64, DX>) -> DMatrix<f64>,
    {
        if self.t == 0 {
            for i in 0..N {
                self.particles[i] = self.model.sample_mu(&mut self.rng);
                self.log_weights[i] = self.model.log_g(y, &self.particles[i]);
            }
            let lse = log_sum_exp(&self.log_weights);
            self.log_cond_like = lse - (N as f64).ln();
        } else {
            let old_log_weights = self.log_weights;
            for i in 0..N {
                let new_sample = self.model.sample_f(&self.particles[i], &mut self.rng);
                // accumulate, not overwrite: these particles were not
                // necessarily resampled at the previous step, so their
                // importance weight must persist (see DESIGN.md).
                self.log_weights[i] += self.model.log_g(y, &new_sample);
                self.particles[i] = new_sample;
            }
            let lse_new = log_sum_exp(&self.log_weights);
            let lse_old = log_sum_exp(&old_log_weights);
            self.log_cond_like = lse_new - lse_old;
        }

        self.expectations = compute_expectations(&self.particles, &self.log_weights, hs);

        self.t += 1;
        if self.log_weights.iter().all(|w| !w.is_finite()) {
            log::warn!("bootstrap filter: all log-weights are -inf at t={}", self.t);
        }
        if self.config.should_resample(self.t) {
            self.resampler
                .resample(&mut self.particles, &mut self.log_weights, &mut self.rng);
            log::debug!("bootstrap filter resampled at t={}", self.t);
        }
    }

    pub fn log_cond_like(&self) -> f64 {
        self.log_cond_like
    }

    pub fn expectations(&self) -> &[DMatrix<f64>] {
        &self.expectations
    }

    pub fn particles(&self) -> &[SVector<f64, DX>; N] {
        &self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resampling::Multinomial;

    /// Simple 1-D linear-Gaussian model so the bootstrap filter can be
    /// checked against the closed-form Kalman baseline (invariant 7).
    struct LinearGaussian {
        initial_std: f64,
        process_std: f64,
        obs_std: f64,
    }

    impl BootstrapModel<1, 1> for LinearGaussian {
        fn sample_mu(&self, rng: &mut StdRng) -> SVector<f64, 1> {
            SVector::<f64, 1>::new(
                crate::dists::Normal::new(0.0, self.initial_std)
                    .unwrap()
                    .sample(rng),
            )
        }

        fn sample_f(&self, xtm1: &SVector<f64, 1>, rng: &mut StdRng) -> SVector<f64, 1> {
            SVector::<f64, 1>::new(
                crate::dists::Normal::new(xtm1[0], self.process_std)
                    .unwrap()
                    .sample(rng),
            )
        }

        fn log_g(&self, yt: &SVector<f64, 1>, xt: &SVector<f64, 1>) -> f64 {
            crate::dists::Normal::new(xt[0], self.obs_std)
                .unwrap()
                .log_density(yt[0])
        }
    }

    #[test]
    fn weight_reset_on_resample() {
        let model = LinearGaussian {
            initial_std: 1.0,
            process_std: 0.2,
            obs_std: 0.3,
        };
        let config = FilterConfig::new(1, Some(7)).unwrap();
        let mut filter: BootstrapFilter<_, _, 200, 1, 1> =
            BootstrapFilter::new(model, Multinomial, config);
        filter.filter::<fn(&SVector<f64, 1>) -> DMatrix<f64>>(&SVector::new(0.5), &[]);
        assert!(filter.log_weights.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn expectation_tracks_observation() {
        let model = LinearGaussian {
            initial_std: 1.0,
            process_std: 0.2,
            obs_std: 0.3,
        };
        let config = FilterConfig::new(1, Some(11)).unwrap();
        let mut filter: BootstrapFilter<_, _, 2000, 1, 1> =
            BootstrapFilter::new(model, Multinomial, config);
        let identity = |x: &SVector<f64, 1>| DMatrix::from_element(1, 1, x[0]);
        filter.filter(&SVector::new(1.0), &[identity]);
        let est = filter.expectations()[0][(0, 0)];
        // posterior mean should land well inside the prior/likelihood span
        assert!(est > 0.0 && est < 1.0);
    }
}
