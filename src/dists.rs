//! The narrow density/sampling interface the core actually consumes
//! (SPEC_FULL.md §6.4 / §10.4). Not a general-purpose probability library —
//! model authors needing other distributions bring their own.

use nalgebra::{SMatrix, SVector};
use rand::Rng;
use rand_distr::{Distribution, Gamma as RandGamma, Normal as RandNormal, StandardNormal};

use crate::error::{FilterError, Result};
use crate::numerical::log_sum_exp;

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Univariate Normal(mean, std).
#[derive(Debug, Clone, Copy)]
pub struct Normal {
    mean: f64,
    std: f64,
}

impl Normal {
    pub fn new(mean: f64, std: f64) -> Result<Self> {
        if !(std > 0.0) {
            return Err(FilterError::InvalidScale(std));
        }
        Ok(Self { mean, std })
    }

    pub fn log_density(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.std;
        -LN_SQRT_2PI - self.std.ln() - 0.5 * z * z
    }

    pub fn density(&self, x: f64) -> f64 {
        self.log_density(x).exp()
    }

    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        let dist = RandNormal::new(self.mean, self.std).expect("validated at construction");
        dist.sample(rng)
    }
}

/// Multivariate Normal with a full covariance matrix, evaluated via a
/// Cholesky factorization (teacher's `extended_kalman_filter.rs` const-generic
/// `SMatrix` idiom).
#[derive(Debug, Clone)]
pub struct MultivariateNormal<const D: usize> {
    mean: SVector<f64, D>,
    cov: SMatrix<f64, D, D>,
    chol_l: SMatrix<f64, D, D>,
    log_det: f64,
}

impl<const D: usize> MultivariateNormal<D> {
    pub fn new(mean: SVector<f64, D>, cov: SMatrix<f64, D, D>) -> Result<Self> {
        let chol = nalgebra::Cholesky::new(cov).ok_or(FilterError::SingularCovariance)?;
        let chol_l = chol.l();
        let log_det: f64 = 2.0 * chol_l.diagonal().iter().map(|d| d.ln()).sum::<f64>();
        Ok(Self {
            mean,
            cov,
            chol_l,
            log_det,
        })
    }

    pub fn log_density(&self, x: &SVector<f64, D>) -> f64 {
        let diff = x - self.mean;
        let sol = self.chol_l.solve_lower_triangular(&diff).expect("lower-triangular solve");
        let quad: f64 = sol.dot(&sol);
        -0.5 * (D as f64 * (2.0 * std::f64::consts::PI).ln() + self.log_det + quad)
    }

    pub fn density(&self, x: &SVector<f64, D>) -> f64 {
        self.log_density(x).exp()
    }

    pub fn sample(&self, rng: &mut impl Rng) -> SVector<f64, D> {
        let z: SVector<f64, D> = SVector::from_fn(|_, _| rng.sample(StandardNormal));
        self.mean + self.chol_l * z
    }

    pub fn mean(&self) -> &SVector<f64, D> {
        &self.mean
    }

    pub fn cov(&self) -> &SMatrix<f64, D, D> {
        &self.cov
    }
}

/// Scaled (generalized) Student-t: location + scale + degrees of freedom.
#[derive(Debug, Clone, Copy)]
pub struct ScaledT {
    location: f64,
    scale: f64,
    dof: f64,
}

impl ScaledT {
    pub fn new(location: f64, scale: f64, dof: f64) -> Result<Self> {
        if !(scale > 0.0) {
            return Err(FilterError::InvalidScale(scale));
        }
        if !(dof > 0.0) {
            return Err(FilterError::InvalidDegreesOfFreedom(dof));
        }
        Ok(Self {
            location,
            scale,
            dof,
        })
    }

    pub fn log_density(&self, x: f64) -> f64 {
        let z = (x - self.location) / self.scale;
        let nu = self.dof;
        ln_gamma((nu + 1.0) / 2.0) - ln_gamma(nu / 2.0)
            - 0.5 * (nu * std::f64::consts::PI).ln()
            - self.scale.ln()
            - (nu + 1.0) / 2.0 * (1.0 + z * z / nu).ln()
    }

    pub fn density(&self, x: f64) -> f64 {
        self.log_density(x).exp()
    }
}

/// Lanczos approximation to ln Γ(x), sufficient for the t-density above.
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        std::f64::consts::PI.ln() - (std::f64::consts::PI * x).sin().ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut a = COEFFS[0];
        let t = x + G + 0.5;
        for (i, c) in COEFFS.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
    }
}

/// Gamma(shape, rate) — rate parameterization, matching `cf_filters::gamma`.
#[derive(Debug, Clone, Copy)]
pub struct Gamma {
    shape: f64,
    rate: f64,
}

impl Gamma {
    pub fn new(shape: f64, rate: f64) -> Result<Self> {
        if !(shape > 0.0) {
            return Err(FilterError::InvalidScale(shape));
        }
        if !(rate > 0.0) {
            return Err(FilterError::InvalidScale(rate));
        }
        Ok(Self { shape, rate })
    }

    pub fn log_density(&self, x: f64) -> f64 {
        if x < 0.0 {
            return f64::NEG_INFINITY;
        }
        self.shape * self.rate.ln() - ln_gamma(self.shape) + (self.shape - 1.0) * x.ln()
            - self.rate * x
    }

    pub fn density(&self, x: f64) -> f64 {
        self.log_density(x).exp()
    }

    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        let dist = RandGamma::new(self.shape, 1.0 / self.rate).expect("validated at construction");
        dist.sample(rng)
    }
}

/// Categorical index sampler: given N log-weights, draws N indices in
/// `[0, N)` with probability proportional to `exp(log_weights[i])`, using
/// the shift-by-max trick (`original_source/include/rv_samp.h`'s `k_gen`).
pub struct KGen;

impl KGen {
    pub fn sample(log_weights: &[f64], n_draws: usize, rng: &mut impl Rng) -> Vec<usize> {
        let total = log_sum_exp(log_weights);
        let cum: Vec<f64> = {
            let mut acc = 0.0;
            log_weights
                .iter()
                .map(|w| {
                    acc += (w - total).exp();
                    acc
                })
                .collect()
        };
        (0..n_draws)
            .map(|_| {
                let u: f64 = rng.gen::<f64>();
                cum.iter().position(|&c| u <= c).unwrap_or(cum.len() - 1)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn standard_normal_density_at_zero() {
        let n = Normal::new(0.0, 1.0).unwrap();
        let expected = 1.0 / (2.0 * std::f64::consts::PI).sqrt();
        assert!((n.density(0.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn normal_rejects_nonpositive_std() {
        assert!(Normal::new(0.0, 0.0).is_err());
        assert!(Normal::new(0.0, -1.0).is_err());
    }

    #[test]
    fn gamma_mean_matches_shape_over_rate() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let g = Gamma::new(3.0, 2.0).unwrap();
        let n = 20_000;
        let mean: f64 = (0..n).map(|_| g.sample(&mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 1.5).abs() < 0.05);
    }

    #[test]
    fn kgen_concentrates_on_dominant_weight() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let log_weights = [f64::NEG_INFINITY, 0.0, f64::NEG_INFINITY];
        let ks = KGen::sample(&log_weights, 50, &mut rng);
        assert!(ks.iter().all(|&k| k == 1));
    }

    #[test]
    fn multivariate_normal_log_density_reduces_to_univariate() {
        let mean = SVector::<f64, 1>::new(0.0);
        let cov = SMatrix::<f64, 1, 1>::new(1.0);
        let mvn = MultivariateNormal::new(mean, cov).unwrap();
        let uni = Normal::new(0.0, 1.0).unwrap();
        let x = SVector::<f64, 1>::new(0.3);
        assert!((mvn.log_density(&x) - uni.log_density(0.3)).abs() < 1e-10);
    }
}
