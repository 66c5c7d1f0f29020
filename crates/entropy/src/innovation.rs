use crate::errors::{EntropyError, Result};
use crate::surrogates::SurrogateModel;
use ndarray::{Array1, Array2, ArrayView2};

/// Local innovation at `x` (1, nx): change of the posterior mean at representer
/// points `zb` per unit of the standardized outcome of an observation at `x`.
///
/// With `Lx` the returned vector, observing at `x` shifts the mean at `zb` by
/// `Lx * w` with `w ~ N(0, 1)` and the covariance by `-Lx Lx^T`.
pub fn gp_innovation_local(
    model: &dyn SurrogateModel,
    zb: &Array2<f64>,
    x: &ArrayView2<f64>,
) -> Result<Array1<f64>> {
    if x.nrows() != 1 {
        return Err(EntropyError::InvalidValueError(format!(
            "innovation computed at one point at a time, got {}",
            x.nrows()
        )));
    }
    let (_, var) = model.predict_valvar(x)?;
    let s = (var[0] + model.noise_variance()).sqrt();
    if s < f64::EPSILON {
        // nothing to learn where there is no uncertainty
        return Ok(Array1::zeros(zb.nrows()));
    }
    let cross = model.predict_covariance(&zb.view(), x)?;
    Ok(cross.column(0).mapv(|c| c / s))
}
