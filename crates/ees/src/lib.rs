//! This library implements an environment-aware, cost-normalized
//! [Entropy Search](https://jmlr.org/papers/v13/hennig12a.html) acquisition function
//! for Bayesian optimization with cheap low fidelity evaluations.
//!
//! Some input variables of the objective, so-called environment variables (dataset
//! size, number of training epochs...), trade evaluation cost against accuracy.
//! The minimizer of interest is the one at full fidelity, i.e. with environment
//! variables at their upper bound. [`EnvEntropySearch`] scores a candidate with
//! the expected information it brings about that minimizer divided by
//! `log(cost + 1e-8)` of its predicted evaluation cost:
//!
//! * representer points discretizing the minimizer distribution are projected onto
//!   the full fidelity subspace ([`EnvironmentMask`]),
//! * the information gain is estimated either analytically ([`AnalyticEstimator`]) or
//!   by Monte-Carlo fantasies ([`MonteCarloEstimator`]),
//! * the gain is scaled by the prediction of a [`CostModel`] ([`cost_normalize`]).
//!
//! Engines come from the [`envsearch_entropy`] crate, the objective posterior is given
//! through its [`SurrogateModel`] trait.
//!
//! ```no_run
//! use envsearch::{CostModel, EnvEntropySearch, Result};
//! use envsearch_entropy::{Entropy, SurrogateModel};
//! use ndarray::{array, Array1, ArrayView2};
//! use std::sync::Arc;
//!
//! // evaluation time grows with the fidelity, the second variable
//! struct LinearCost;
//!
//! impl CostModel for LinearCost {
//!     fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
//!         Ok(x.column(1).mapv(|s| 1. + 10. * s))
//!     }
//! }
//!
//! # fn run(model: Arc<dyn SurrogateModel>) -> Result<()> {
//! let xlimits = array![[0., 1.], [0., 1.]];
//! let mut acq = EnvEntropySearch::analytic(Entropy::params(&xlimits).seed(42), array![false, true])?;
//! acq.update(model, Arc::new(LinearCost))?;
//! let values = acq.score(&array![[0.3, 0.1], [0.3, 1.]])?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod acquisition;
mod cost;
mod environment;
mod errors;
pub mod estimators;

pub use acquisition::*;
pub use cost::{cost_normalize, CostModel, COST_OFFSET};
pub use environment::*;
pub use errors::*;
pub use estimators::{AnalyticEstimator, EntropyEstimator, InputShape, MonteCarloEstimator};

pub use envsearch_entropy::{SurrogateModel, ENVSEARCH_LOG};
