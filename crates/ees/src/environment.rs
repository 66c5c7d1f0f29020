use crate::errors::{EesError, Result};
use envsearch_entropy::pin_env;
use ndarray::{Array1, Array2};

/// Flags of environment variables together with the upper bounds they are
/// projected onto. The upper bound of an environment variable stands for
/// the full fidelity setting (whole dataset, all epochs...).
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentMask {
    is_env: Array1<bool>,
    upper: Array1<f64>,
}

impl EnvironmentMask {
    /// Mask over the input space `xlimits` (nx, 2), `is_env` of length nx
    pub fn new(is_env: Array1<bool>, xlimits: &Array2<f64>) -> Result<Self> {
        if xlimits.ncols() != 2 {
            return Err(EesError::InvalidConfigError(format!(
                "`xlimits` should be a (nx, 2) matrix, got {:?}",
                xlimits.shape()
            )));
        }
        if is_env.len() != xlimits.nrows() {
            return Err(EesError::InvalidDimension {
                expected: xlimits.nrows(),
                actual: is_env.len(),
            });
        }
        Ok(EnvironmentMask {
            is_env,
            upper: xlimits.column(1).to_owned(),
        })
    }

    /// Environment variable flags
    pub fn is_env(&self) -> &Array1<bool> {
        &self.is_env
    }

    /// Upper bounds of the input space
    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Input space dimension
    pub fn n_dims(&self) -> usize {
        self.is_env.len()
    }

    /// Set environment components of every row of `x` (n, nx) to their
    /// upper bound, other components are left untouched
    pub fn project(&self, x: &mut Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_dims() {
            return Err(EesError::InvalidDimension {
                expected: self.n_dims(),
                actual: x.ncols(),
            });
        }
        pin_env(x, &self.is_env, &self.upper)?;
        Ok(())
    }
}
