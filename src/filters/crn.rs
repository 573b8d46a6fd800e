use nalgebra::{DMatrix, SVector};

use crate::config::FilterConfig;
use crate::numerical::log_sum_exp;
use crate::resampling::HilbertSystematic;
use crate::traits::CrnModel;

use super::compute_expectations;

/// SISR with common random numbers (§4.3): proposals are deterministic
/// functions of an externally supplied normal vector per particle, and
/// resampling uses the Hilbert-sorted systematic scheme coupled across time
/// via an externally supplied `u0`. Unlike the other three variants this
/// filter owns no PRNG of its own: every stochastic input is supplied by
/// the caller, which is the entire point of common random numbers (§4.3).
pub struct CrnFilter<M, const N: usize, const DX: usize, const DY: usize, const DU: usize> {
    model: M,
    hilbert: HilbertSystematic,
    config: FilterConfig,
    t: u64,
    particles: [SVector<f64, DX>; N],
    log_weights: [f64; N],
    log_cond_like: f64,
    expectations: Vec<DMatrix<f64>>,
}

impl<M, const N: usize, const DX: usize, const DY: usize, const DU: usize>
    CrnFilter<M, N, DX, DY, DU>
where
    M: CrnModel<DX, DY, DU>,
{
    pub fn new(model: M, hilbert: HilbertSystematic, config: FilterConfig) -> Self {
        Self {
            model,
            hilbert,
            config,
            t: 0,
            particles: [SVector::zeros(); N],
            log_weights: [0.0; N],
            log_cond_like: 0.0,
            expectations: Vec::new(),
        }
    }

    /// `us` supplies one normal/uniform vector per particle (deterministic
    /// proposal input); `resample_u0` is consumed only on steps that
    /// actually resample.
    pub fn filter<F>(
        &mut self,
        y: &SVector<f64, DY>,
        us: &[SVector<f64, DU>; N],
        resample_u0: f64,
        hs: &[F],
    ) where
        F: Fn(&SVector<f64, DX>) -> DMatrix<f64>,
    {
        if self.t == 0 {
            for i in 0..N {
                let x1 = self.model.propose_q1(y, &us[i]);
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
                let xt = self.model.propose_q(&xtm1, y, &us[i]);
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
            log::warn!("CRN filter: all log-weights are -inf at t={}", self.t);
        }
        if self.config.should_resample(self.t) {
            self.hilbert
                .resample_with_u0(&mut self.particles, &mut self.log_weights, resample_u0);
            log::debug!("CRN filter resampled at t={}", self.t);
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
