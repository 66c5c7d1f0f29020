//! Simple surrogate models used by tests, demos and benches.
//!
//! [`KernelSurrogate`] is a gaussian process with fixed hyperparameters
//! (squared exponential kernel) conditioned on training data: no likelihood
//! optimization takes place.
use crate::errors::{EntropyError, Result};
use crate::surrogates::SurrogateModel;
use crate::utils::robust_cholesky;
use linfa_linalg::triangular::*;
use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2, Zip};

/// Gaussian process posterior with squared exponential kernel and constant mean
#[derive(Clone, Debug)]
pub struct KernelSurrogate {
    xt: Array2<f64>,
    length_scales: Array1<f64>,
    variance: f64,
    noise: f64,
    mean: f64,
    /// lower cholesky factor of K(xt, xt) + noise I
    chol: Array2<f64>,
    /// (K + noise I)^-1 (yt - mean)
    alpha: Array1<f64>,
}

impl KernelSurrogate {
    /// Condition the process on training data `xt` (nt, nx), `yt` (nt,)
    pub fn new(
        xt: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        yt: &Array1<f64>,
        length_scales: Array1<f64>,
        variance: f64,
        noise: f64,
    ) -> Result<Self> {
        if length_scales.len() != xt.ncols() {
            return Err(EntropyError::InvalidDimension {
                expected: xt.ncols(),
                actual: length_scales.len(),
            });
        }
        if yt.len() != xt.nrows() {
            return Err(EntropyError::InvalidValueError(format!(
                "{} training outputs given for {} training inputs",
                yt.len(),
                xt.nrows()
            )));
        }
        let mean = yt.mean().unwrap_or(0.);
        let mut surrogate = KernelSurrogate {
            xt: xt.to_owned(),
            length_scales,
            variance,
            noise,
            mean,
            chol: Array2::zeros((0, 0)),
            alpha: Array1::zeros(0),
        };
        let mut k = surrogate.kernel(&surrogate.xt.view(), &surrogate.xt.view());
        k.diag_mut().mapv_inplace(|v| v + noise);
        let chol = robust_cholesky(&k)?;
        let centered = (yt - mean).insert_axis(Axis(1));
        let tmp = chol.solve_triangular(&centered, UPLO::Lower)?;
        let alpha = chol.t().solve_triangular(&tmp, UPLO::Upper)?;
        surrogate.chol = chol;
        surrogate.alpha = alpha.remove_axis(Axis(1));
        Ok(surrogate)
    }

    fn kernel(&self, x1: &ArrayView2<f64>, x2: &ArrayView2<f64>) -> Array2<f64> {
        let mut k = Array2::zeros((x1.nrows(), x2.nrows()));
        Zip::from(k.rows_mut()).and(x1.rows()).for_each(|mut krow, a| {
            Zip::from(&mut krow).and(x2.rows()).for_each(|kij, b| {
                let d2 = Zip::from(&a)
                    .and(&b)
                    .and(&self.length_scales)
                    .fold(0f64, |acc, ai, bi, l| acc + ((ai - bi) / l).powi(2));
                *kij = self.variance * (-0.5 * d2).exp();
            });
        });
        k
    }

    /// `L^-1 K(xt, x)` used by both variance and covariance predictions
    fn whitened_cross(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
        let kxt = self.kernel(&self.xt.view(), x);
        Ok(self.chol.solve_triangular(&kxt, UPLO::Lower)?)
    }

    fn check_dims(&self, x: &ArrayView2<f64>) -> Result<()> {
        if x.ncols() != self.xt.ncols() {
            Err(EntropyError::InvalidDimension {
                expected: self.xt.ncols(),
                actual: x.ncols(),
            })
        } else {
            Ok(())
        }
    }
}

impl SurrogateModel for KernelSurrogate {
    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        self.check_dims(x)?;
        let kx = self.kernel(x, &self.xt.view());
        let mean = kx.dot(&self.alpha) + self.mean;
        let v = self.whitened_cross(x)?;
        let var = v
            .mapv(|e| e * e)
            .sum_axis(Axis(0))
            .mapv(|s| (self.variance - s).max(0.));
        Ok((mean, var))
    }

    fn predict_covariance(
        &self,
        x1: &ArrayView2<f64>,
        x2: &ArrayView2<f64>,
    ) -> Result<Array2<f64>> {
        self.check_dims(x1)?;
        self.check_dims(x2)?;
        let v1 = self.whitened_cross(x1)?;
        let v2 = self.whitened_cross(x2)?;
        Ok(self.kernel(x1, x2) - v1.t().dot(&v2))
    }

    fn noise_variance(&self) -> f64 {
        self.noise
    }
}
