use nalgebra::SVector;

use crate::dists::ScaledT;
use crate::error::{FilterError, Result};

/// Conjugate Gamma(shape, rate) precision filter for a zero-mean Gaussian
/// observation, with a discount factor `delta` applied to the prior
/// parameters before absorbing each new observation
/// (`original_source/include/cf_filters.h`'s `gamFilter`).
#[derive(Debug, Clone, Copy)]
pub struct Gamma {
    delta: f64,
    shape: f64,
    rate: f64,
    log_cond_like: f64,
    fresh: bool,
}

impl Gamma {
    pub fn new(initial_shape: f64, initial_rate: f64, delta: f64) -> Result<Self> {
        if !(initial_shape > 0.0) || !(initial_rate > 0.0) {
            return Err(FilterError::InvalidScale(initial_shape.min(initial_rate)));
        }
        if !(delta > 0.0 && delta <= 1.0) {
            return Err(FilterError::InvalidScale(delta));
        }
        Ok(Self {
            delta,
            shape: initial_shape,
            rate: initial_rate,
            log_cond_like: 0.0,
            fresh: true,
        })
    }

    /// Absorb a new observation, discounting the prior (skipped on the
    /// first call) and recomputing the predictive log conditional
    /// likelihood before incrementing shape/rate
    /// (`cf_filters.h`'s `gamFilter::update`).
    pub fn update(&mut self, y: f64) {
        if !self.fresh {
            self.shape *= self.delta;
            self.rate *= self.delta;
        }
        self.fresh = false;

        let scale = (self.rate / self.shape).sqrt();
        self.log_cond_like = ScaledT::new(0.0, scale, 2.0 * self.shape)
            .expect("shape/rate stay positive under discounting")
            .log_density(y);

        self.shape += 0.5;
        self.rate += 0.5 * y * y;
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn log_cond_like(&self) -> f64 {
        self.log_cond_like
    }

    /// Forecast degrees of freedom of the predictive scaled-t distribution.
    fn dof(&self) -> f64 {
        2.0 * self.shape
    }

    /// Mean of the one-step-ahead predictive distribution (zero, by the
    /// zero-mean-observation assumption) — undefined when `dof <= 1`
    /// (resolves the reference implementation's undefined-return-branch bug,
    /// see DESIGN.md Open Question 2).
    pub fn get_fcast_mean(&self) -> Result<f64> {
        if self.dof() > 1.0 {
            Ok(0.0)
        } else {
            Err(FilterError::InsufficientDegreesOfFreedom)
        }
    }

    /// Variance of the one-step-ahead predictive distribution — undefined
    /// when `dof <= 2`.
    pub fn get_fcast_cov(&self) -> Result<f64> {
        let dof = self.dof();
        if dof > 2.0 {
            let scale2 = self.rate / self.shape;
            Ok(scale2 * dof / (dof - 2.0))
        } else {
            Err(FilterError::InsufficientDegreesOfFreedom)
        }
    }
}

/// Multivariate-response variant of [`Gamma`]: a shared scalar shape with a
/// per-dimension rate vector (`cf_filters.h`'s `multivGamFilter`).
#[derive(Debug, Clone)]
pub struct MultivariateGamma<const DV: usize> {
    delta: f64,
    shape: f64,
    rate: SVector<f64, DV>,
    log_cond_like: f64,
    fresh: bool,
}

impl<const DV: usize> MultivariateGamma<DV> {
    pub fn new(initial_shape: f64, initial_rate: SVector<f64, DV>, delta: f64) -> Result<Self> {
        if !(initial_shape > 0.0) {
            return Err(FilterError::InvalidScale(initial_shape));
        }
        if initial_rate.iter().any(|&r| !(r > 0.0)) {
            return Err(FilterError::InvalidScale(0.0));
        }
        if !(delta > 0.0 && delta <= 1.0) {
            return Err(FilterError::InvalidScale(delta));
        }
        Ok(Self {
            delta,
            shape: initial_shape,
            rate: initial_rate,
            log_cond_like: 0.0,
            fresh: true,
        })
    }

    /// Absorb a new observation. The predictive log conditional likelihood
    /// is the sum of each dimension's independent scaled-t density, sharing
    /// the discounted scalar shape/dof but each using its own discounted
    /// rate component (`cf_filters.h`'s `multivGamFilter::update`).
    pub fn update(&mut self, y: &SVector<f64, DV>) {
        if !self.fresh {
            self.shape *= self.delta;
            self.rate *= self.delta;
        }
        self.fresh = false;

        let dof = 2.0 * self.shape;
        self.log_cond_like = (0..DV)
            .map(|i| {
                let scale = (self.rate[i] / self.shape).sqrt();
                ScaledT::new(0.0, scale, dof)
                    .expect("shape/rate stay positive under discounting")
                    .log_density(y[i])
            })
            .sum();

        self.shape += 0.5;
        self.rate += 0.5 * y.component_mul(y);
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn rate(&self) -> &SVector<f64, DV> {
        &self.rate
    }

    pub fn log_cond_like(&self) -> f64 {
        self.log_cond_like
    }

    fn dof(&self) -> f64 {
        2.0 * self.shape
    }

    pub fn get_fcast_mean(&self) -> Result<SVector<f64, DV>> {
        if self.dof() > 1.0 {
            Ok(SVector::zeros())
        } else {
            Err(FilterError::InsufficientDegreesOfFreedom)
        }
    }

    pub fn get_fcast_cov(&self) -> Result<SVector<f64, DV>> {
        let dof = self.dof();
        if dof > 2.0 {
            Ok(self.rate.map(|r| (r / self.shape) * dof / (dof - 2.0)))
        } else {
            Err(FilterError::InsufficientDegreesOfFreedom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_shrinks_toward_new_observation() {
        let mut g = Gamma::new(5.0, 5.0, 0.9).unwrap();
        g.update(0.0);
        assert!((g.shape() - (0.9 * 5.0 + 0.5)).abs() < 1e-12);
        assert!((g.rate() - 0.9 * 5.0).abs() < 1e-12);
    }

    #[test]
    fn fcast_mean_errors_with_insufficient_dof() {
        let g = Gamma::new(0.1, 1.0, 1.0).unwrap();
        assert!(matches!(
            g.get_fcast_mean(),
            Err(FilterError::InsufficientDegreesOfFreedom)
        ));
    }

    #[test]
    fn fcast_cov_succeeds_with_sufficient_dof() {
        let g = Gamma::new(5.0, 5.0, 1.0).unwrap();
        assert!(g.get_fcast_cov().is_ok());
    }

    #[test]
    fn multivariate_update_is_elementwise() {
        let mut mg =
            MultivariateGamma::<2>::new(5.0, SVector::<f64, 2>::new(2.0, 3.0), 1.0).unwrap();
        mg.update(&SVector::<f64, 2>::new(1.0, 2.0));
        assert!((mg.rate()[0] - (2.0 + 0.5)).abs() < 1e-12);
        assert!((mg.rate()[1] - (3.0 + 2.0)).abs() < 1e-12);
    }

    #[test]
    fn first_update_uses_prior_shape_undiscounted() {
        let mut g = Gamma::new(5.0, 5.0, 0.5).unwrap();
        g.update(0.0);
        let expected = ScaledT::new(0.0, (5.0_f64 / 5.0).sqrt(), 10.0)
            .unwrap()
            .log_density(0.0);
        assert!((g.log_cond_like() - expected).abs() < 1e-12);
    }

    #[test]
    fn second_update_discounts_before_computing_log_cond_like() {
        let mut g = Gamma::new(5.0, 5.0, 0.5).unwrap();
        g.update(0.0);
        g.update(1.0);
        let shape = 0.5 * 5.5;
        let rate = 0.5 * 5.0;
        let expected = ScaledT::new(0.0, (rate / shape).sqrt(), 2.0 * shape)
            .unwrap()
            .log_density(1.0);
        assert!((g.log_cond_like() - expected).abs() < 1e-12);
    }

    #[test]
    fn multivariate_log_cond_like_sums_per_dimension_densities() {
        let mut mg =
            MultivariateGamma::<2>::new(5.0, SVector::<f64, 2>::new(2.0, 3.0), 1.0).unwrap();
        mg.update(&SVector::<f64, 2>::new(1.0, 2.0));
        let expected: f64 = [
            ScaledT::new(0.0, (2.0_f64 / 5.0).sqrt(), 10.0).unwrap().log_density(1.0),
            ScaledT::new(0.0, (3.0_f64 / 5.0).sqrt(), 10.0).unwrap().log_density(2.0),
        ]
        .iter()
        .sum();
        assert!((mg.log_cond_like() - expected).abs() < 1e-12);
    }
}
