//! This library implements the base engines of [Entropy Search](https://jmlr.org/papers/v13/hennig12a.html),
//! a Bayesian optimization strategy selecting the next evaluation by the expected information
//! it brings about the location of the global minimizer.
//!
//! The distribution of the minimizer is discretized over representer points sampled
//! from a log expected improvement measure ([`RepresenterSampler`]). Two engines estimate
//! the probability of each representer point to be the minimizer:
//!
//! * [`Entropy`] approximates it with expectation propagation ([`joint_min`]) and predicts
//!   analytically how an observation changes it,
//! * [`EntropyMc`] counts minima over posterior samples and fantasizes observations
//!   by innovating those samples.
//!
//! Both engines are parameterized by [`EntropyParams`] and only rely on the posterior of the
//! objective given through the [`SurrogateModel`] trait.
//!
//! ```no_run
//! use envsearch_entropy::{AnalyticEntropyEngine, Entropy, EntropyEngine, SurrogateModel};
//! use ndarray::array;
//! use std::sync::Arc;
//!
//! # fn run(model: Arc<dyn SurrogateModel>) -> envsearch_entropy::Result<()> {
//! let xlimits = array![[0., 1.], [0., 1.]];
//! let mut engine = Entropy::new(Entropy::params(&xlimits).seed(42))?;
//! engine.update(model)?;
//! let gain = engine.compute(&array![[0.3, 0.7]].view(), false)?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod analytic;
mod engine;
pub mod epmgp;
mod errors;
mod incumbent;
mod innovation;
mod montecarlo;
mod parameters;
mod representers;
mod state;
mod surrogates;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use analytic::*;
pub use engine::*;
pub use epmgp::joint_min;
pub use errors::*;
pub use incumbent::*;
pub use innovation::*;
pub use montecarlo::*;
pub use parameters::*;
pub use representers::{log_ei_measure, RepresenterPoints, RepresenterSampler, LOG_DENSITY_FLOOR};
pub use state::*;
pub use surrogates::*;

/// Env variable to enable env_logger logging in demos and benches
pub const ENVSEARCH_LOG: &str = "ENVSEARCH_LOG";
