//! Incumbent computation: the current best guess of the minimizer location
//! used as the reference value of the representer points measure.
use crate::errors::{EntropyError, Result};
use crate::surrogates::SurrogateModel;
use log::debug;
use ndarray::{Array, Array1, Array2, Axis, Zip};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of random candidates evaluated to find the incumbent
pub const DEFAULT_N_CANDIDATES: usize = 500;

/// Criterion minimized over the posterior to select the incumbent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum IncumbentStrategy {
    /// Minimize the posterior mean
    #[default]
    PosteriorMean,
    /// Minimize the posterior mean plus one standard deviation
    PosteriorMeanAndStd,
}

/// Incumbent computation configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct IncumbentConfig {
    /// Criterion minimized over the posterior
    pub strategy: IncumbentStrategy,
    /// Environment variables flags: when set, flagged components
    /// of every candidate are pinned to their upper bound
    pub is_env: Option<Array1<bool>>,
    /// Number of random candidates
    pub n_candidates: usize,
}

impl Default for IncumbentConfig {
    fn default() -> Self {
        IncumbentConfig {
            strategy: IncumbentStrategy::default(),
            is_env: None,
            n_candidates: DEFAULT_N_CANDIDATES,
        }
    }
}

impl IncumbentConfig {
    /// Configuration for the given strategy
    pub fn new(strategy: IncumbentStrategy) -> Self {
        IncumbentConfig {
            strategy,
            ..Default::default()
        }
    }

    /// Restrict the incumbent search to the full fidelity subspace
    pub fn env_variables(mut self, is_env: Array1<bool>) -> Self {
        self.is_env = Some(is_env);
        self
    }

    /// Set the number of random candidates
    pub fn n_candidates(mut self, n_candidates: usize) -> Self {
        self.n_candidates = n_candidates;
        self
    }
}

/// Best guess of the minimizer
#[derive(Clone, Debug)]
pub struct Incumbent {
    /// Location
    pub x: Array1<f64>,
    /// Value of the strategy criterion at `x`
    pub value: f64,
}

/// Pin components flagged in `is_env` of every row of `x` (n, nx) to
/// `upper`, other components are left untouched
pub fn pin_env(x: &mut Array2<f64>, is_env: &Array1<bool>, upper: &Array1<f64>) -> Result<()> {
    for len in [x.ncols(), upper.len()] {
        if len != is_env.len() {
            return Err(EntropyError::InvalidDimension {
                expected: is_env.len(),
                actual: len,
            });
        }
    }
    Zip::from(x.columns_mut())
        .and(is_env)
        .and(upper)
        .for_each(|mut col, &env, &ub| {
            if env {
                col.fill(ub);
            }
        });
    Ok(())
}

/// Compute the incumbent of the surrogate `model` within `xlimits` using
/// a random search driven by `config`
pub fn compute_incumbent(
    model: &dyn SurrogateModel,
    xlimits: &Array2<f64>,
    config: &IncumbentConfig,
    rng: &mut Xoshiro256Plus,
) -> Result<Incumbent> {
    let nx = xlimits.nrows();
    if let Some(is_env) = &config.is_env {
        if is_env.len() != nx {
            return Err(EntropyError::InvalidDimension {
                expected: nx,
                actual: is_env.len(),
            });
        }
    }
    let lower = xlimits.column(0).to_owned();
    let upper = xlimits.column(1).to_owned();
    let unit: Array2<f64> = Array::random_using((config.n_candidates, nx), Uniform::new(0., 1.), rng);
    let mut candidates = unit * (&upper - &lower) + &lower;
    if let Some(is_env) = &config.is_env {
        pin_env(&mut candidates, is_env, &upper)?;
    }

    let (mean, var) = model.predict_valvar(&candidates.view())?;
    let crit = match config.strategy {
        IncumbentStrategy::PosteriorMean => mean,
        IncumbentStrategy::PosteriorMeanAndStd => mean + var.mapv(f64::sqrt),
    };
    let best = crit.argmin().map_err(|err| {
        EntropyError::SurrogateError(format!("Incumbent criterion cannot be minimized: {err}"))
    })?;
    let x = candidates.index_axis(Axis(0), best).to_owned();
    debug!("Incumbent {} with value {}", x, crit[best]);
    Ok(Incumbent {
        x,
        value: crit[best],
    })
}
