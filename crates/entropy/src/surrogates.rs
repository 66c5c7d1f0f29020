use crate::errors::Result;
use linfa_linalg::eigh::*;
use ndarray::{Array, Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

/// A trait for the probabilistic surrogate of the objective function
/// consumed by entropy search engines.
///
/// Only the posterior is required: how the model is trained is up to the caller.
pub trait SurrogateModel: Send + Sync {
    /// Predict both output values and variances at n points given as a (n, nx) matrix
    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)>;

    /// Posterior covariance between outputs at `x1` (n1, nx) and `x2` (n2, nx)
    /// as a (n1, n2) matrix
    fn predict_covariance(&self, x1: &ArrayView2<f64>, x2: &ArrayView2<f64>)
        -> Result<Array2<f64>>;

    /// Variance of the observation noise (0 for noise free observations)
    fn noise_variance(&self) -> f64 {
        0.
    }

    /// Sample `n_traj` posterior trajectories at n points given as a (n, nx) matrix.
    ///
    /// Returns a (n, n_traj) matrix. The joint covariance is decomposed using
    /// its eigenvalues which is more robust than cholesky when points get close.
    fn sample(
        &self,
        x: &ArrayView2<f64>,
        n_traj: usize,
        rng: &mut Xoshiro256Plus,
    ) -> Result<Array2<f64>> {
        let (mean, _) = self.predict_valvar(x)?;
        let cov = self.predict_covariance(x, x)?;
        let (eigvals, eigvecs) = cov.eigh_into()?;
        // eigenvalues lower bounded at 1e-9 to discard numerical noise
        let sqrt_vals = eigvals.mapv(|v| if v < 1e-9 { 0. } else { v.sqrt() });
        let c = eigvecs.dot(&Array2::from_diag(&sqrt_vals));
        let draws: Array2<f64> = Array::random_using((x.nrows(), n_traj), StandardNormal, rng);
        Ok(mean.insert_axis(Axis(1)) + c.dot(&draws))
    }
}
