use nalgebra::{DMatrix, SVector};
use rand::rngs::StdRng;

use crate::config::FilterConfig;
use crate::numerical::log_sum_exp;
use crate::resampling::Resampler;
use crate::rng::seeded_rng;
use crate::traits::BootstrapCovModel;

use super::compute_expectations_cov;

/// Covariate-aware bootstrap particle filter (§4.1): a per-step covariate
/// `z_t` threads into every hook, and `q1` is a genuine proposal distinct
/// from `mu` at t=1, so the first step's weight is the full `log mu + log g
/// - log q1` rather than collapsing to `log g` alone
/// (`original_source/include/pf/bootstrap_filter_with_covariates.h`'s
/// `BSFilterWC`).
pub struct BootstrapFilterCov<M, R, const N: usize, const DX: usize, const DY: usize, const DCOV: usize>
{
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

impl<M, R, const N: usize, const DX: usize, const DY: usize, const DCOV: usize>
    BootstrapFilterCov<M, R, N, DX, DY, DCOV>
where
    M: BootstrapCovModel<DX, DY, DCOV>,
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

    /// Advances the filter with one new observation `y` and its covariate
    /// `z`. `hs` are expectation callbacks taking both the particle and the
    /// covariate; pass an empty slice if you only need the likelihood.
    pub fn filter<F>(&mut self, y: &SVector<f64, DY>, z: &SVector<f64, DCOV>, hs: &[F])
    where
        F: Fn(&SVector<f64, DX>, &SVector<f64, DCOV>) -> DMatrix<f64>,
    {
        if self.t == 0 {
            for i in 0..N {
                let x1 = self.model.sample_q1(y, z, &mut self.rng);
                self.log_weights[i] = self.model.log_mu(&x1, z) + self.model.log_g(y, &x1, z)
                    - self.model.log_q1(&x1, y, z);
                self.particles[i] = x1;
            }
            let lse = log_sum_exp(&self.log_weights);
            self.log_cond_like = lse - (N as f64).ln();
        } else {
            let old_log_weights = self.log_weights;
            for i in 0..N {
                let new_sample = self.model.sample_f(&self.particles[i], z, &mut self.rng);
                self.log_weights[i] += self.model.log_g(y, &new_sample, z);
                self.particles[i] = new_sample;
            }
            let lse_new = log_sum_exp(&self.log_weights);
            let lse_old = log_sum_exp(&old_log_weights);
            self.log_cond_like = lse_new - lse_old;
        }

        self.expectations = compute_expectations_cov(&self.particles, z, &self.log_weights, hs);

        self.t += 1;
        if self.log_weights.iter().all(|w| !w.is_finite()) {
            log::warn!("covariate bootstrap filter: all log-weights are -inf at t={}", self.t);
        }
        if self.config.should_resample(self.t) {
            self.resampler
                .resample(&mut self.particles, &mut self.log_weights, &mut self.rng);
            log::debug!("covariate bootstrap filter resampled at t={}", self.t);
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
    use crate::dists::Normal;
    use crate::resampling::Multinomial;

    /// Linear-Gaussian model whose process noise scale is driven by a
    /// scalar covariate `z_t`, so `q1` deliberately differs from `mu`
    /// (a tighter proposal centered on the covariate).
    struct CovariateLinearGaussian {
        initial_std: f64,
        process_std: f64,
        obs_std: f64,
    }

    impl BootstrapCovModel<1, 1, 1> for CovariateLinearGaussian {
        fn log_mu(&self, x1: &SVector<f64, 1>, _z1: &SVector<f64, 1>) -> f64 {
            Normal::new(0.0, self.initial_std).unwrap().log_density(x1[0])
        }

        fn sample_q1(
            &self,
            _y1: &SVector<f64, 1>,
            z1: &SVector<f64, 1>,
            rng: &mut StdRng,
        ) -> SVector<f64, 1> {
            SVector::new(Normal::new(z1[0], self.initial_std).unwrap().sample(rng))
        }

        fn log_q1(&self, x1: &SVector<f64, 1>, _y1: &SVector<f64, 1>, z1: &SVector<f64, 1>) -> f64 {
            Normal::new(z1[0], self.initial_std).unwrap().log_density(x1[0])
        }

        fn sample_f(
            &self,
            xtm1: &SVector<f64, 1>,
            zt: &SVector<f64, 1>,
            rng: &mut StdRng,
        ) -> SVector<f64, 1> {
            SVector::new(
                Normal::new(xtm1[0] + zt[0], self.process_std)
                    .unwrap()
                    .sample(rng),
            )
        }

        fn log_g(&self, yt: &SVector<f64, 1>, xt: &SVector<f64, 1>, _zt: &SVector<f64, 1>) -> f64 {
            Normal::new(xt[0], self.obs_std).unwrap().log_density(yt[0])
        }
    }

    #[test]
    fn weight_reset_on_resample() {
        let model = CovariateLinearGaussian {
            initial_std: 1.0,
            process_std: 0.2,
            obs_std: 0.3,
        };
        let config = FilterConfig::new(1, Some(7)).unwrap();
        let mut filter: BootstrapFilterCov<_, _, 200, 1, 1, 1> =
            BootstrapFilterCov::new(model, Multinomial, config);
        filter.filter::<fn(&SVector<f64, 1>, &SVector<f64, 1>) -> DMatrix<f64>>(
            &SVector::new(0.5),
            &SVector::new(0.0),
            &[],
        );
        assert!(filter.log_weights.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn covariate_shifts_expectation_toward_its_own_value() {
        let model = CovariateLinearGaussian {
            initial_std: 1.0,
            process_std: 0.2,
            obs_std: 0.3,
        };
        let config = FilterConfig::new(1, Some(11)).unwrap();
        let mut filter: BootstrapFilterCov<_, _, 2000, 1, 1, 1> =
            BootstrapFilterCov::new(model, Multinomial, config);
        let identity = |x: &SVector<f64, 1>, _z: &SVector<f64, 1>| DMatrix::from_element(1, 1, x[0]);
        filter.filter(&SVector::new(2.0), &SVector::new(2.0), &[identity]);
        let est = filter.expectations()[0][(0, 0)];
        // the covariate nudges both proposal and observation toward 2.0, so
        // the posterior mean should land well above the z=0 prior mean.
        assert!(est > 0.5);
    }
}
