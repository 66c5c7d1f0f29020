use crate::errors::{EntropyError, Result};
use crate::incumbent::IncumbentConfig;
use linfa::ParamGuard;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of representer points of the analytic engine
pub const DEFAULT_N_REPRESENTER: usize = 50;
/// Default number of representer points of the Monte-Carlo engine
pub const DEFAULT_MC_N_REPRESENTER: usize = 10;
/// Default number of fantasized innovation values (Monte-Carlo engine)
pub const DEFAULT_N_HALS_VALS: usize = 100;
/// Default number of function samples at representer points (Monte-Carlo engine)
pub const DEFAULT_N_FUNC_SAMPLES: usize = 100;
/// Default number of quadrature points over innovation values (analytic engine)
pub const DEFAULT_N_QUADRATURE: usize = 100;
/// Default number of MCMC sweeps used to sample representer points
pub const DEFAULT_N_MCMC_STEPS: usize = 20;
/// Default convergence tolerance of expectation propagation
pub const DEFAULT_EP_TOLERANCE: f64 = 1e-3;

/// Validated entropy search engine parameters
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct EntropyValidParams {
    /// Input space as a (nx, 2) matrix of \[lower bound, upper bound\] rows
    pub(crate) xlimits: Array2<f64>,
    pub(crate) n_representer: usize,
    pub(crate) n_hals_vals: usize,
    pub(crate) n_func_samples: usize,
    pub(crate) n_quadrature: usize,
    pub(crate) n_mcmc_steps: usize,
    pub(crate) ep_tolerance: f64,
    pub(crate) incumbent: IncumbentConfig,
    pub(crate) seed: Option<u64>,
}

impl EntropyValidParams {
    /// Get input space bounds
    pub fn xlimits(&self) -> &Array2<f64> {
        &self.xlimits
    }

    /// Get upper bounds of the input space
    pub fn upper_bounds(&self) -> Array1<f64> {
        self.xlimits.column(1).to_owned()
    }

    /// Get number of representer points
    pub fn n_representer(&self) -> usize {
        self.n_representer
    }

    /// Get number of fantasized innovation values
    pub fn n_hals_vals(&self) -> usize {
        self.n_hals_vals
    }

    /// Get number of function samples
    pub fn n_func_samples(&self) -> usize {
        self.n_func_samples
    }

    /// Get number of quadrature points
    pub fn n_quadrature(&self) -> usize {
        self.n_quadrature
    }

    /// Get number of MCMC sweeps
    pub fn n_mcmc_steps(&self) -> usize {
        self.n_mcmc_steps
    }

    /// Get EP convergence tolerance
    pub fn ep_tolerance(&self) -> f64 {
        self.ep_tolerance
    }

    /// Get incumbent configuration
    pub fn incumbent(&self) -> &IncumbentConfig {
        &self.incumbent
    }

    /// Get random generator seed
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

#[derive(Clone, Debug)]
/// The set of parameters that can be specified to build an entropy search
/// engine, either [`Entropy`](crate::Entropy) or [`EntropyMc`](crate::EntropyMc).
pub struct EntropyParams(EntropyValidParams);

impl EntropyParams {
    /// A constructor given the input space as a (nx, 2) matrix
    /// \[\[lower bound, upper bound\], ...\] and the number of representer points
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = f64>, Ix2>, n_representer: usize) -> Self {
        Self(EntropyValidParams {
            xlimits: xlimits.to_owned(),
            n_representer,
            n_hals_vals: DEFAULT_N_HALS_VALS,
            n_func_samples: DEFAULT_N_FUNC_SAMPLES,
            n_quadrature: DEFAULT_N_QUADRATURE,
            n_mcmc_steps: DEFAULT_N_MCMC_STEPS,
            ep_tolerance: DEFAULT_EP_TOLERANCE,
            incumbent: IncumbentConfig::default(),
            seed: None,
        })
    }

    /// Set the number of representer points
    pub fn n_representer(mut self, n_representer: usize) -> Self {
        self.0.n_representer = n_representer;
        self
    }

    /// Set the number of fantasized innovation values used by the Monte-Carlo engine
    pub fn n_hals_vals(mut self, n_hals_vals: usize) -> Self {
        self.0.n_hals_vals = n_hals_vals;
        self
    }

    /// Set the number of function samples drawn at representer points
    pub fn n_func_samples(mut self, n_func_samples: usize) -> Self {
        self.0.n_func_samples = n_func_samples;
        self
    }

    /// Set the number of quadrature points used by the analytic engine
    pub fn n_quadrature(mut self, n_quadrature: usize) -> Self {
        self.0.n_quadrature = n_quadrature;
        self
    }

    /// Set the number of MCMC sweeps of representer points sampling
    pub fn n_mcmc_steps(mut self, n_mcmc_steps: usize) -> Self {
        self.0.n_mcmc_steps = n_mcmc_steps;
        self
    }

    /// Set EP convergence tolerance
    pub fn ep_tolerance(mut self, ep_tolerance: f64) -> Self {
        self.0.ep_tolerance = ep_tolerance;
        self
    }

    /// Set incumbent computation configuration
    pub fn incumbent(mut self, incumbent: IncumbentConfig) -> Self {
        self.0.incumbent = incumbent;
        self
    }

    /// Restrict the incumbent search to the subspace where
    /// environment variables are at their upper bound
    pub fn env_variables(mut self, is_env: Array1<bool>) -> Self {
        self.0.incumbent = self.0.incumbent.env_variables(is_env);
        self
    }

    /// Set random generator seed to get reproducible results
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = Some(seed);
        self
    }
}

impl From<EntropyValidParams> for EntropyParams {
    fn from(valid: EntropyValidParams) -> Self {
        EntropyParams(valid)
    }
}

impl ParamGuard for EntropyParams {
    type Checked = EntropyValidParams;
    type Error = EntropyError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let p = &self.0;
        if p.xlimits.ncols() != 2 || p.xlimits.nrows() == 0 {
            return Err(EntropyError::InvalidValueError(format!(
                "`xlimits` should be a (nx, 2) matrix with nx > 0, got {:?}",
                p.xlimits.shape()
            )));
        }
        if p
            .xlimits
            .rows()
            .into_iter()
            .any(|b| !b[0].is_finite() || !b[1].is_finite() || b[0] > b[1])
        {
            return Err(EntropyError::InvalidValueError(
                "`xlimits` rows should be finite [lower, upper] with lower <= upper".to_string(),
            ));
        }
        if p.n_representer < 2 {
            return Err(EntropyError::InvalidValueError(format!(
                "`n_representer` should be at least 2, got {}",
                p.n_representer
            )));
        }
        for (name, n) in [
            ("n_hals_vals", p.n_hals_vals),
            ("n_func_samples", p.n_func_samples),
            ("n_quadrature", p.n_quadrature),
            ("incumbent.n_candidates", p.incumbent.n_candidates),
        ] {
            if n == 0 {
                return Err(EntropyError::InvalidValueError(format!(
                    "`{name}` cannot be 0!"
                )));
            }
        }
        if p.ep_tolerance <= 0. || p.ep_tolerance.is_nan() {
            return Err(EntropyError::InvalidValueError(format!(
                "`ep_tolerance` should be positive, got {}",
                p.ep_tolerance
            )));
        }
        if let Some(is_env) = &p.incumbent.is_env {
            if is_env.len() != p.xlimits.nrows() {
                return Err(EntropyError::InvalidDimension {
                    expected: p.xlimits.nrows(),
                    actual: is_env.len(),
                });
            }
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_valid_params() {
        let params = EntropyParams::new(&array![[0., 1.], [-1., 2.]], DEFAULT_N_REPRESENTER)
            .n_func_samples(20)
            .seed(42)
            .check()
            .expect("valid params");
        assert_eq!(50, params.n_representer());
        assert_eq!(20, params.n_func_samples());
        assert_eq!(DEFAULT_N_HALS_VALS, params.n_hals_vals());
        assert_eq!(Some(42), params.seed());
        assert_eq!(array![1., 2.], params.upper_bounds());
    }

    #[test]
    fn test_invalid_xlimits() {
        let res = EntropyParams::new(&array![[1., 0.]], 10).check();
        assert!(matches!(res, Err(EntropyError::InvalidValueError(_))));
        let res = EntropyParams::new(&array![[0., 1., 2.]], 10).check();
        assert!(matches!(res, Err(EntropyError::InvalidValueError(_))));
    }

    #[test]
    fn test_invalid_counts() {
        let xlimits = array![[0., 1.]];
        assert!(EntropyParams::new(&xlimits, 1).check().is_err());
        assert!(EntropyParams::new(&xlimits, 10)
            .n_func_samples(0)
            .check()
            .is_err());
        assert!(EntropyParams::new(&xlimits, 10)
            .ep_tolerance(0.)
            .check()
            .is_err());
    }

    #[test]
    fn test_env_variables_dimension() {
        let res = EntropyParams::new(&array![[0., 1.], [0., 1.]], 10)
            .env_variables(array![true])
            .check();
        assert!(matches!(
            res,
            Err(EntropyError::InvalidDimension {
                expected: 2,
                actual: 1
            })
        ));
    }
}
