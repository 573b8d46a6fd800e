use nalgebra::{Cholesky, SMatrix, SVector};

use crate::error::{FilterError, Result};

/// Linear-Gaussian Kalman filter, `DX`-dimensional state, `DY`-dimensional
/// observation (`original_source/include/cf_filters.h`'s `kalman`, cast into
/// a const-generic `SMatrix`/`SVector` form).
///
/// The transition (`a`, `q`) and observation (`c`, `r`) matrices are fixed
/// for the lifetime of the filter, matching the reference implementation's
/// time-invariant usage.
#[derive(Debug, Clone)]
pub struct Kalman<const DX: usize, const DY: usize> {
    mean: SVector<f64, DX>,
    cov: SMatrix<f64, DX, DX>,
    a: SMatrix<f64, DX, DX>,
    q: SMatrix<f64, DX, DX>,
    c: SMatrix<f64, DY, DX>,
    r: SMatrix<f64, DY, DY>,
    log_cond_like: f64,
    /// First update skips the predict step, matching the convention that
    /// the first latent state is indexed at time 1.
    fresh: bool,
}

impl<const DX: usize, const DY: usize> Kalman<DX, DY> {
    pub fn new(
        initial_mean: SVector<f64, DX>,
        initial_cov: SMatrix<f64, DX, DX>,
        a: SMatrix<f64, DX, DX>,
        q: SMatrix<f64, DX, DX>,
        c: SMatrix<f64, DY, DX>,
        r: SMatrix<f64, DY, DY>,
    ) -> Self {
        Self {
            mean: initial_mean,
            cov: initial_cov,
            a,
            q,
            c,
            r,
            log_cond_like: 0.0,
            fresh: true,
        }
    }

    /// Absorb a new observation, advancing the mean/covariance and
    /// recomputing the log conditional likelihood.
    pub fn update(&mut self, y: &SVector<f64, DY>) -> Result<()> {
        if !self.fresh {
            self.mean = &self.a * self.mean;
            self.cov = &self.a * &self.cov * self.a.transpose() + &self.q;
        }
        self.fresh = false;

        let pred_y = &self.c * self.mean;
        let innovation = y - pred_y;
        let s_raw = &self.c * &self.cov * self.c.transpose() + &self.r;
        let s = 0.5 * (&s_raw + s_raw.transpose());

        let chol = Cholesky::new(s).ok_or(FilterError::SingularCovariance)?;
        let kalman_gain = &self.cov * self.c.transpose() * chol.inverse();

        self.mean += &kalman_gain * innovation;
        self.cov = (SMatrix::<f64, DX, DX>::identity() - &kalman_gain * &self.c) * &self.cov;

        let l = chol.l();
        let sol = l
            .solve_lower_triangular(&innovation)
            .ok_or(FilterError::SingularCovariance)?;
        let quad: f64 = sol.dot(&sol);
        let log_det: f64 = 2.0 * l.diagonal().iter().map(|d| d.ln()).sum::<f64>();
        self.log_cond_like =
            -0.5 * (DY as f64 * (2.0 * std::f64::consts::PI).ln() + log_det + quad);

        Ok(())
    }

    pub fn log_cond_like(&self) -> f64 {
        self.log_cond_like
    }

    pub fn mean(&self) -> &SVector<f64, DX> {
        &self.mean
    }

    pub fn cov(&self) -> &SMatrix<f64, DX, DX> {
        &self.cov
    }

    /// One-step-ahead forecast mean E[y_t | y_{1:t-1}] (supplemented from
    /// `cf_filters.h`'s `getPredYMean`).
    pub fn pred_y_mean(&self) -> SVector<f64, DY> {
        &self.c * self.mean
    }

    /// One-step-ahead forecast covariance Var(y_t | y_{1:t-1}) (supplemented
    /// from `cf_filters.h`'s `getPredYVar`).
    pub fn pred_y_cov(&self) -> SMatrix<f64, DY, DY> {
        &self.c * &self.cov * self.c.transpose() + &self.r
    }
}
