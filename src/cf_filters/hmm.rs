use nalgebra::{SMatrix, SVector};

use crate::error::{FilterError, Result};
use crate::numerical::log_sum_exp;

const DISTRIBUTION_TOLERANCE: f64 = 1e-3;
const LOG_PROB_TOLERANCE: f64 = 1e-9;

/// Finite-state HMM filter operating entirely in log-probability space
/// (`original_source/include/cf_filters.h`'s `hmm`, re-expressed in
/// log-space — the original is linear-space).
#[derive(Debug, Clone)]
pub struct Hmm<const NS: usize> {
    initial_log_probs: SVector<f64, NS>,
    log_trans: SMatrix<f64, NS, NS>,
    filter_log_vec: SVector<f64, NS>,
    log_cond_like: f64,
    fresh: bool,
}

fn validate_log_distribution(v: &[f64]) -> Result<()> {
    let lse = log_sum_exp(v);
    if (lse).abs() > DISTRIBUTION_TOLERANCE {
        return Err(FilterError::InvalidInitialDistribution { log_sum_exp: lse });
    }
    if v.iter().any(|&p| p > LOG_PROB_TOLERANCE) {
        return Err(FilterError::InvalidInitialDistribution { log_sum_exp: lse });
    }
    Ok(())
}

impl<const NS: usize> Hmm<NS> {
    /// `initial_log_probs` is the log P(x1 = j); `log_trans[i][j]` is
    /// log P(x_t = j | x_{t-1} = i). Construction fails if the initial
    /// distribution or any transition row isn't a valid log-probability
    /// vector.
    pub fn new(
        initial_log_probs: SVector<f64, NS>,
        log_trans: SMatrix<f64, NS, NS>,
    ) -> Result<Self> {
        validate_log_distribution(initial_log_probs.as_slice())?;
        for row in 0..NS {
            let row_vals: Vec<f64> = (0..NS).map(|col| log_trans[(row, col)]).collect();
            let lse = log_sum_exp(&row_vals);
            if lse.abs() > DISTRIBUTION_TOLERANCE || row_vals.iter().any(|&p| p > LOG_PROB_TOLERANCE)
            {
                return Err(FilterError::InvalidTransitionRow {
                    row,
                    log_sum_exp: lse,
                });
            }
        }
        Ok(Self {
            initial_log_probs,
            log_trans,
            filter_log_vec: SVector::from_element(f64::NEG_INFINITY),
            log_cond_like: 0.0,
            fresh: true,
        })
    }

    /// Advance the filter with the current time's log-conditional-density
    /// vector `log_cond_dens_vec[j] = log g(y_t | x_t = j)`.
    pub fn update(&mut self, log_cond_dens_vec: &SVector<f64, NS>) {
        let predicted: SVector<f64, NS> = if self.fresh {
            self.fresh = false;
            self.initial_log_probs
        } else {
            SVector::from_fn(|j, _| {
                let terms: Vec<f64> = (0..NS)
                    .map(|i| self.filter_log_vec[i] + self.log_trans[(i, j)])
                    .collect();
                log_sum_exp(&terms)
            })
        };

        let raw: SVector<f64, NS> = predicted + log_cond_dens_vec;
        let total = log_sum_exp(raw.as_slice());
        self.log_cond_like = total;
        self.filter_log_vec = raw.map(|v| v - total);
    }

    pub fn log_cond_like(&self) -> f64 {
        self.log_cond_like
    }

    /// The current filtering distribution, in log space.
    pub fn filter_log_vec(&self) -> &SVector<f64, NS> {
        &self.filter_log_vec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S1: 2-state HMM, uniform prior and transition.
    #[test]
    fn scenario_s1_uniform_prior() {
        let initial = SVector::<f64, 2>::new(0.5_f64.ln(), 0.5_f64.ln());
        let trans = SMatrix::<f64, 2, 2>::new(
            0.5_f64.ln(),
            0.5_f64.ln(),
            0.5_f64.ln(),
            0.5_f64.ln(),
        );
        let mut hmm = Hmm::new(initial, trans).unwrap();
        let log_cond_dens = SVector::<f64, 2>::new(1.0_f64.ln(), f64::NEG_INFINITY);
        hmm.update(&log_cond_dens);

        assert!((hmm.filter_log_vec()[0] - 1.0_f64.ln()).abs() < 1e-9);
        assert!(hmm.filter_log_vec()[1].is_infinite() && hmm.filter_log_vec()[1] < 0.0);
        assert!((hmm.log_cond_like() - 0.5_f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn rejects_invalid_initial_distribution() {
        let bad_initial = SVector::<f64, 2>::new(0.0, 0.0); // sums to log(2), not 0
        let trans = SMatrix::<f64, 2, 2>::new(
            0.5_f64.ln(),
            0.5_f64.ln(),
            0.5_f64.ln(),
            0.5_f64.ln(),
        );
        assert!(matches!(
            Hmm::new(bad_initial, trans),
            Err(FilterError::InvalidInitialDistribution { .. })
        ));
    }

    #[test]
    fn rejects_invalid_transition_row() {
        let initial = SVector::<f64, 2>::new(0.5_f64.ln(), 0.5_f64.ln());
        let bad_trans = SMatrix::<f64, 2, 2>::new(0.0, 0.0, 0.5_f64.ln(), 0.5_f64.ln());
        assert!(matches!(
            Hmm::new(initial, bad_trans),
            Err(FilterError::InvalidTransitionRow { .. })
        ));
    }
}
