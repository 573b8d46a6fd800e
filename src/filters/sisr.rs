use nalgebra::{DMatrix, SVector};
use rand::rngs::StdRng;

use crate::config::FilterConfig;
use crate::numerical::log_sum_exp;
use crate::resampling::Resampler;
use crate::rng::seeded_rng;
use crate::traits::SisrModel;

use super::compute_expectations;

/// SISR particle filter (§4.2): an arbitrary proposal `q` replaces the
/// prior, so the weight update picks up an extra `log f - log q` term
/// relative to the bootstrap filter
/// (`original_source/include/sisr_filter.h`).
pub struct SisrFilter<M, R, const N: usize, const DX: usize, const DY: usize> {
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

impl<M, R, const N: usize, const DX: usize, const DY: usize> SisrFilter<M, R, N, DX, DY>
where
    M: SisrModel<DX, DY>,
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
            for i in 0..N {
                let x1 = self.model.sample_q1(y, &mut self.rng);
                self.log_weights[i] =
                    self.model.log_mu(&x1) + self.model.log_g(y, &x1) - self.model.log_q1(&x1, y);
                self.particles[i] = x1;
            }
            let lse = log_sum_exp(&self.log_weights);
            self.log_cond_like = lse - (N as f64).ln();
        } else {
            let old_log_weights = self.log_weights;
            for i in 0..N {
                let xtm1 = self.particles[i];
                let xt = self.model.sample_q(&xtm1, y, &mut self.rng);
                self.log_weights[i] += self.model.log_f(&xt, &xtm1) + self.model.log_g(y, &xt)
                    - self.model.log_q(&xt, &xtm1, y);
                self.particles[i] = xt;
            }
            let lse_new = log_sum_exp(&self.log_weights);
            let lse_old = log_sum_exp(&old_log_weights);
            self.log_cond_like = lse_new - lse_old;
        }

        self.expectations = compute_expectations(&self.particles, &self.log_weights, hs);

        self.t += 1;
        if self.log_weights.iter().all(|w| !w.is_finite()) {
            log::warn!("SISR filter: all log-weights are -inf at t={}", self.t);
        }
        if self.config.should_resample(self.t) {
            self.resampler
                .resample(&mut self.particles, &mut self.log_weights, &mut self.rng);
            log::debug!("SISR filter resampled at t={}", self.t);
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
