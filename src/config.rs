//! Construction-time configuration for each filter family, matching the
//! enumerated options of SPEC_FULL.md §6.1 / §10.1.

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

/// Common knobs shared by every particle filter and RBPF composite:
/// how often to resample, and how to seed the filter's owned PRNG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub resampling_period: u32,
    pub seed: Option<u64>,
}

impl FilterConfig {
    pub fn new(resampling_period: u32, seed: Option<u64>) -> Result<Self> {
        if resampling_period == 0 {
            return Err(FilterError::InvalidResamplingPeriod(resampling_period));
        }
        Ok(Self {
            resampling_period,
            seed,
        })
    }

    /// Resample iff the 1-based time index `t` is a multiple of the period.
    pub fn should_resample(&self, t: u64) -> bool {
        t % self.resampling_period as u64 == 0
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            resampling_period: 1,
            seed: None,
        }
    }
}

pub type BootstrapConfig = FilterConfig;
pub type BootstrapCovConfig = FilterConfig;
pub type SisrConfig = FilterConfig;
pub type CrnConfig = FilterConfig;
pub type ApfConfig = FilterConfig;
pub type RbpfHmmConfig = FilterConfig;
pub type RbpfKalmanConfig = FilterConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_resampling_period() {
        assert!(matches!(
            FilterConfig::new(0, None),
            Err(FilterError::InvalidResamplingPeriod(0))
        ));
    }

    #[test]
    fn should_resample_on_multiples_of_period() {
        let cfg = FilterConfig::new(3, Some(42)).unwrap();
        assert!(!cfg.should_resample(1));
        assert!(!cfg.should_resample(2));
        assert!(cfg.should_resample(3));
        assert!(cfg.should_resample(6));
    }
}
