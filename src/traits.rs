//! Model hooks for each particle-filter variant (SPEC_FULL.md §6.3, §9's
//! "class-hierarchy re-expression"). The reference C++ declares these as
//! pure virtual methods on a per-variant abstract base class
//! (`original_source/include/pf_base.h`, `bootstrap_filter.h`,
//! `sisr_filter.h`, `auxiliary_pf.h`, `rbpf.h`); here each becomes a trait
//! capturing exactly the hooks that variant's algorithm consumes, and the
//! filter becomes a generic engine over that trait plus a fixed size and a
//! resampler, instead of virtual dispatch.

use nalgebra::{SMatrix, SVector};
use rand::rngs::StdRng;

use crate::cf_filters::{Hmm, Kalman};

/// Hooks for the bootstrap particle filter (§4.1). The prior transition is
/// also the proposal, so `mu` and `q1` are the same density at t=1 and the
/// `log mu`/`log q1` terms in the weight update cancel outright — neither a
/// `log_mu` nor a `log_q1` hook is needed, only a sampler for `mu`.
pub trait BootstrapModel<const DX: usize, const DY: usize> {
    fn sample_mu(&self, rng: &mut StdRng) -> SVector<f64, DX>;
    fn sample_f(&self, xtm1: &SVector<f64, DX>, rng: &mut StdRng) -> SVector<f64, DX>;
    fn log_g(&self, yt: &SVector<f64, DY>, xt: &SVector<f64, DX>) -> f64;
}

/// Hooks for the covariate-aware bootstrap variant (§4.1): a per-step
/// covariate `z_t` threads into every hook, and unlike the base bootstrap
/// filter `q1` is a genuine, distinct proposal from `mu` — so the t=1
/// weight is the full three-term `log mu + log g - log q1`
/// (`original_source/include/pf/bootstrap_filter_with_covariates.h`'s
/// `BSFilterWC`).
pub trait BootstrapCovModel<const DX: usize, const DY: usize, const DCOV: usize> {
    fn log_mu(&self, x1: &SVector<f64, DX>, z1: &SVector<f64, DCOV>) -> f64;
    fn sample_q1(
        &self,
        y1: &SVector<f64, DY>,
        z1: &SVector<f64, DCOV>,
        rng: &mut StdRng,
    ) -> SVector<f64, DX>;
    fn log_q1(&self, x1: &SVector<f64, DX>, y1: &SVector<f64, DY>, z1: &SVector<f64, DCOV>) -> f64;
    fn sample_f(
        &self,
        xtm1: &SVector<f64, DX>,
        zt: &SVector<f64, DCOV>,
        rng: &mut StdRng,
    ) -> SVector<f64, DX>;
    fn log_g(&self, yt: &SVector<f64, DY>, xt: &SVector<f64, DX>, zt: &SVector<f64, DCOV>) -> f64;
}

/// Hooks for SISR (§4.2): an arbitrary proposal `q` replaces the prior as
/// the transition sampler, so both `f` (for the weight's transition-density
/// term) and `q` (for sampling and its own density term) are needed.
pub trait SisrModel<const DX: usize, const DY: usize> {
    fn log_mu(&self, x1: &SVector<f64, DX>) -> f64;
    fn sample_q1(&self, y1: &SVector<f64, DY>, rng: &mut StdRng) -> SVector<f64, DX>;
    fn log_q1(&self, x1: &SVector<f64, DX>, y1: &SVector<f64, DY>) -> f64;
    fn log_f(&self, xt: &SVector<f64, DX>, xtm1: &SVector<f64, DX>) -> f64;
    fn sample_q(
        &self,
        xtm1: &SVector<f64, DX>,
        yt: &SVector<f64, DY>,
        rng: &mut StdRng,
    ) -> SVector<f64, DX>;
    fn log_q(&self, xt: &SVector<f64, DX>, xtm1: &SVector<f64, DX>, yt: &SVector<f64, DY>) -> f64;
    fn log_g(&self, yt: &SVector<f64, DY>, xt: &SVector<f64, DX>) -> f64;
}

/// Hooks for SISR with common random numbers (§4.3): proposals are
/// deterministic functions of an externally supplied vector `u` rather than
/// drawn from an owned PRNG.
pub trait CrnModel<const DX: usize, const DY: usize, const DU: usize> {
    fn log_mu(&self, x1: &SVector<f64, DX>) -> f64;
    fn propose_q1(&self, y1: &SVector<f64, DY>, u: &SVector<f64, DU>) -> SVector<f64, DX>;
    fn log_q1(&self, x1: &SVector<f64, DX>, y1: &SVector<f64, DY>) -> f64;
    fn log_f(&self, xt: &SVector<f64, DX>, xtm1: &SVector<f64, DX>) -> f64;
    fn propose_q(
        &self,
        xtm1: &SVector<f64, DX>,
        yt: &SVector<f64, DY>,
        u: &SVector<f64, DU>,
    ) -> SVector<f64, DX>;
    fn log_q(&self, xt: &SVector<f64, DX>, xtm1: &SVector<f64, DX>, yt: &SVector<f64, DY>) -> f64;
    fn log_g(&self, yt: &SVector<f64, DY>, xt: &SVector<f64, DX>) -> f64;
}

/// Hooks for the auxiliary particle filter (§4.4): adds the look-ahead
/// propagation hook `eta` used to build first-stage weights.
pub trait ApfModel<const DX: usize, const DY: usize> {
    fn log_mu(&self, x1: &SVector<f64, DX>) -> f64;
    /// eta: the look-ahead propagation hook, typically the conditional mean
    /// E[x_t | x_{t-1}].
    fn propagate(&self, xtm1: &SVector<f64, DX>) -> SVector<f64, DX>;
    fn sample_q1(&self, y1: &SVector<f64, DY>, rng: &mut StdRng) -> SVector<f64, DX>;
    fn log_q1(&self, x1: &SVector<f64, DX>, y1: &SVector<f64, DY>) -> f64;
    fn sample_q(
        &self,
        xtm1: &SVector<f64, DX>,
        yt: &SVector<f64, DY>,
        rng: &mut StdRng,
    ) -> SVector<f64, DX>;
    fn log_q(&self, xt: &SVector<f64, DX>, xtm1: &SVector<f64, DX>, yt: &SVector<f64, DY>) -> f64;
    fn log_g(&self, yt: &SVector<f64, DY>, xt: &SVector<f64, DX>) -> f64;
}

/// Hooks for the RBPF-HMM composite (§4.5, §4.6): `x2` is the SMC-sampled
/// component, `NS` is the inner HMM's number of discrete states for `x1`.
pub trait RbpfHmmModel<const DX2: usize, const DY: usize, const NS: usize> {
    fn log_mu_x2(&self, x21: &SVector<f64, DX2>) -> f64;
    fn sample_q1_x2(&self, y1: &SVector<f64, DY>, rng: &mut StdRng) -> SVector<f64, DX2>;
    fn log_q1_x2(&self, x21: &SVector<f64, DX2>, y1: &SVector<f64, DY>) -> f64;
    fn init_hmm_prob_vec(&self, x21: &SVector<f64, DX2>) -> SVector<f64, NS>;
    fn init_hmm_trans_mat(&self, x21: &SVector<f64, DX2>) -> SMatrix<f64, NS, NS>;
    fn sample_q_x2(
        &self,
        x2tm1: &SVector<f64, DX2>,
        yt: &SVector<f64, DY>,
        rng: &mut StdRng,
    ) -> SVector<f64, DX2>;
    fn log_q_x2(
        &self,
        x2t: &SVector<f64, DX2>,
        x2tm1: &SVector<f64, DX2>,
        yt: &SVector<f64, DY>,
    ) -> f64;
    fn log_f_x2(&self, x2t: &SVector<f64, DX2>, x2tm1: &SVector<f64, DX2>) -> f64;
    /// Advances the inner HMM filter with the discrete-state-conditional
    /// log-observation-density vector implied by `yt` and `x2t`.
    fn update_hmm(&self, inner: &mut Hmm<NS>, yt: &SVector<f64, DY>, x2t: &SVector<f64, DX2>);
}

/// Hooks for the RBPF-Kalman composite (§4.5, §4.6): `DX1`/`DY1` are the
/// inner Kalman filter's state/observation dimensions.
pub trait RbpfKalmanModel<const DX1: usize, const DY1: usize, const DX2: usize, const DY: usize> {
    fn log_mu_x2(&self, x21: &SVector<f64, DX2>) -> f64;
    fn sample_q1_x2(&self, y1: &SVector<f64, DY>, rng: &mut StdRng) -> SVector<f64, DX2>;
    fn log_q1_x2(&self, x21: &SVector<f64, DX2>, y1: &SVector<f64, DY>) -> f64;
    fn init_kalman(&self, x21: &SVector<f64, DX2>) -> Kalman<DX1, DY1>;
    fn sample_q_x2(
        &self,
        x2tm1: &SVector<f64, DX2>,
        yt: &SVector<f64, DY>,
        rng: &mut StdRng,
    ) -> SVector<f64, DX2>;
    fn log_q_x2(
        &self,
        x2t: &SVector<f64, DX2>,
        x2tm1: &SVector<f64, DX2>,
        yt: &SVector<f64, DY>,
    ) -> f64;
    fn log_f_x2(&self, x2t: &SVector<f64, DX2>, x2tm1: &SVector<f64, DX2>) -> f64;
    /// Advances the inner Kalman filter with the observation implied by
    /// `yt` and `x2t` (e.g. projecting `yt` down to the inner filter's own
    /// observation space).
    fn update_kalman(&self, inner: &mut Kalman<DX1, DY1>, yt: &SVector<f64, DY>, x2t: &SVector<f64, DX2>);
}
