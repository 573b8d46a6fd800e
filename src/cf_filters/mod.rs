//! Self-contained closed-form recursive estimators: linear-Gaussian Kalman,
//! discrete HMM (log-space), and conjugate Gamma precision filters
//! (`original_source/include/cf_filters.h`). Each exposes a sequential
//! update and a getter for its most recent log conditional likelihood, both
//! standalone and as the inner kernel of a Rao-Blackwellized particle
//! filter (see `crate::rbpf`).

mod gamma;
mod hmm;
mod kalman;

pub use gamma::{Gamma, MultivariateGamma};
pub use hmm::Hmm;
pub use kalman::Kalman;
