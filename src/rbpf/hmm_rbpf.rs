use nalgebra::{DMatrix, SVector};
use rand::rngs::StdRng;

use crate::cf_filters::Hmm;
use crate::config::FilterConfig;
use crate::numerical::log_sum_exp;
use crate::resampling::multinomial_indices;
use crate::rng::seeded_rng;
use crate::traits::RbpfHmmModel;

use super::compute_expectations_rbpf;

/// RBPF composite with a discrete-HMM inner filter (§4.5, §4.6):
/// `original_source/include/rbpf.h`'s `rbpf_hmm`.
pub struct RbpfHmm<M, const N: usize, const DX2: usize, const DY: usize, const NS: usize> {
    model: M,
    config: FilterConfig,
    rng: StdRng,
    t: u64,
    x2_particles: [SVector<f64, DX2>; N],
    inner: Option<Vec<Hmm<NS>>>,
    log_weights: [f64; N],
    log_cond_like: f64,
    expectations: Vec<DMatrix<f64>>,
}

impl<M, const N: usize, const DX2: usize, const DY: usize, const NS: usize>
    RbpfHmm<M, N, DX2, DY, NS>
where
    M: RbpfHmmModel<DX2, DY, NS>,
{
    pub fn new(model: M, config: FilterConfig) -> Self {
        let rng = seeded_rng(config.seed);
        Self {
            model,
            config,
            rng,
            t: 0,
            x2_particles: [SVector::zeros(); N],
            inner: None,
            log_weights: [0.0; N],
            log_cond_like: 0.0,
            expectations: Vec::new(),
        }
    }

    pub fn filter<F>(&mut self, y: &SVector<f64, DY>, hs: &[F])
    where
        F: Fn(&SVector<f64, NS>, &SVector<f64, DX2>) -> DMatrix<f64>,
    {
        if self.t == 0 {
            let mut inner_filters = Vec::with_capacity(N);
            for i in 0..N {
                let x2 = self.model.sample_q1_x2(y, &mut self.rng);
                let probs = self.model.init_hmm_prob_vec(&x2);
                let trans = self.model.init_hmm_trans_mat(&x2);
                let mut hmm =
                    Hmm::new(probs, trans).expect("model-supplied HMM parameters must be valid");
                self.model.update_hmm(&mut hmm, y, &x2);
                self.log_weights[i] =
                    hmm.log_cond_like() + self.model.log_mu_x2(&x2) - self.model.log_q1_x2(&x2, y);
                self.x2_particles[i] = x2;
                inner_filters.push(hmm);
            }
            self.inner = Some(inner_filters);
            let lse = log_sum_exp(&self.log_weights);
            self.log_cond_like = lse - (N as f64).ln();
        } else {
            let old_particles = self.x2_particles;
            let old_log_weights = self.log_weights;
            let mut inner_filters = self.inner.take().expect("initialized at t=0");

            for i in 0..N {
                let new_x2 = self.model.sample_q_x2(&old_particles[i], y, &mut self.rng);
                self.model.update_hmm(&mut inner_filters[i], y, &new_x2);
                self.log_weights[i] += inner_filters[i].log_cond_like()
                    + self.model.log_f_x2(&new_x2, &old_particles[i])
                    - self.model.log_q_x2(&new_x2, &old_particles[i], y);
                self.x2_particles[i] = new_x2;
            }

            self.inner = Some(inner_filters);
            let lse_new = log_sum_exp(&self.log_weights);
            let lse_old = log_sum_exp(&old_log_weights);
            self.log_cond_like = lse_new - lse_old;
        }

        let suff_stats: [SVector<f64, NS>; N] =
            std::array::from_fn(|i| *self.inner.as_ref().unwrap()[i].filter_log_vec());
        self.expectations =
            compute_expectations_rbpf(&suff_stats, &self.x2_particles, &self.log_weights, hs);

        self.t += 1;
        if self.log_weights.iter().all(|w| !w.is_finite()) {
            log::warn!("RBPF-HMM filter: all log-weights are -inf at t={}", self.t);
        }
        if self.config.should_resample(self.t) {
            let selected = multinomial_indices(&self.log_weights, &mut self.rng);
            let old_x2 = self.x2_particles;
            let old_inner = self.inner.take().expect("populated above");
            self.x2_particles = std::array::from_fn(|i| old_x2[selected[i]]);
            self.inner = Some(
                selected
                    .iter()
                    .map(|&k| old_inner[k].clone())
                    .collect(),
            );
            self.log_weights = [0.0; N];
            log::debug!("RBPF-HMM filter resampled at t={}", self.t);
        }
    }

    pub fn log_cond_like(&self) -> f64 {
        self.log_cond_like
    }

    pub fn expectations(&self) -> &[DMatrix<f64>] {
        &self.expectations
    }
}
