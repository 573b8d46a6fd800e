use nalgebra::{DMatrix, SVector};
use rand::rngs::StdRng;

use crate::config::FilterConfig;
use crate::dists::KGen;
use crate::numerical::log_sum_exp;
use crate::resampling::Resampler;
use crate::rng::seeded_rng;
use crate::traits::ApfModel;

use super::compute_expectations;

/// Auxiliary particle filter (§4.4): biases the index sampler toward
/// particles whose one-step-ahead prediction better explains `y_t`
/// (`original_source/include/auxiliary_pf.h`).
pub struct ApfFilter<M, R, const N: usize, const DX: usize, const DY: usize> {
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

impl<M, R, const N: usize, const DX: usize, const DY: usize> ApfFilter<M, R, N, DX, DY>
where
    M: ApfModel<DX, DY>,
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

    pub fn filter<F>(&mut self, y: &SVector<f64, DY>, hs: &[F])
    where
        F: Fn(&SVector<f64, DX>) -> DMatrix<f64>,
    {
        if self.t == 0 {
            // reduces to the SISR initial step (§4.2 / §4.4).
            for i in 0..N {
                let x1 = self.model.sample_q1(y, &mut self.rng);
                self.log_weights[i] =
                    self.model.log_mu(&x1) + self.model.log_g(y, &x1) - self.model.log_q1(&x1, y);
                self.particles[i] = x1;
            }
            let lse = log_sum_exp(&self.log_weights);
            self.log_cond_like = lse - (N as f64).ln();
        } else {
            let old_particles = self.particles;
            let old_log_weights = self.log_weights;

            let lambda: [f64; N] = std::array::from_fn(|i| {
                let eta = self.model.propagate(&old_particles[i]);
                old_log_weights[i] + self.model.log_g(y, &eta)
            });

            let ks = KGen::sample(&lambda, N, &mut self.rng);

            let mut new_particles = [SVector::<f64, DX>::zeros(); N];
            let mut new_log_weights = [0.0_f64; N];
            for i in 0..N {
                let xtm1k = old_particles[ks[i]];
                let xt = self.model.sample_q(&xtm1k, y, &mut self.rng);
                let mu_t = self.model.propagate(&xtm1k);
                new_log_weights[i] = self.model.log_g(y, &xt) - self.model.log_g(y, &mu_t);
                new_particles[i] = xt;
            }

            let lse_new = log_sum_exp(&new_log_weights);
            let lse_lambda = log_sum_exp(&lambda);
            let lse_old = log_sum_exp(&old_log_weights);
            self.log_cond_like = lse_new + lse_lambda - 2.0 * lse_old;

            self.particles = new_particles;
            self.log_weights = new_log_weights;
        }

        self.expectations = compute_expectations(&self.particles, &self.log_weights, hs);

        self.t += 1;
        if self.log_weights.iter().all(|w| !w.is_finite()) {
            log::warn!("APF filter: all log-weights are -inf at t={}", self.t);
        }
        if self.config.should_resample(self.t) {
            self.resampler
                .resample(&mut self.particles, &mut self.log_weights, &mut self.rng);
            log::debug!("APF filter resampled at t={}", self.t);
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
