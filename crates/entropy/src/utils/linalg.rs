use crate::errors::Result;
use linfa_linalg::cholesky::*;
use log::warn;
use ndarray::{Array2, ArrayBase, ArrayView1, Data, Ix1, Ix2};

/// Initial diagonal jitter tried when a covariance matrix is not positive definite
const JITTER_INIT: f64 = 1e-10;
/// Number of jitter magnifications tried before giving up
const JITTER_TRIALS: usize = 6;

/// Lower Cholesky factor of a covariance matrix.
///
/// Covariance matrices at representer points are often ill-conditioned
/// (points close to each other or to training data), so a growing
/// diagonal jitter is added until the factorization succeeds.
pub fn robust_cholesky(cov: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<Array2<f64>> {
    match cov.cholesky() {
        Ok(l) => Ok(l),
        Err(err) => {
            let eye = Array2::<f64>::eye(cov.nrows());
            let mut jitter = JITTER_INIT;
            for _ in 0..JITTER_TRIALS {
                let jittered = cov + &(&eye * jitter);
                if let Ok(l) = jittered.cholesky() {
                    warn!("Cholesky decomposition needed a diagonal jitter of {jitter:e}");
                    return Ok(l);
                }
                jitter *= 100.;
            }
            Err(err.into())
        }
    }
}

/// Outer product `u v^T`
pub fn outer(
    u: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    v: &ArrayBase<impl Data<Elem = f64>, Ix1>,
) -> Array2<f64> {
    let mut res = Array2::zeros((u.len(), v.len()));
    for (i, ui) in u.iter().enumerate() {
        res.row_mut(i).assign(&v.mapv(|vj| ui * vj));
    }
    res
}

/// `log(sum(exp(v)))` computed without overflow
pub fn log_sum_exp(v: &ArrayView1<f64>) -> f64 {
    let max = v.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
    if max.is_infinite() {
        return max;
    }
    let s = max + v.mapv(|x| (x - max).exp()).sum().ln();
    if s.is_infinite() {
        max
    } else {
        s
    }
}
