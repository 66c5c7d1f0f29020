use crate::errors::{EesError, Result};
use ndarray::{s, Array1, Array2, ArrayView2, Zip};

/// Offset keeping the normalizing log finite for a null cost
pub const COST_OFFSET: f64 = 1e-8;

/// A trait for the model of the evaluation cost of the objective function
pub trait CostModel: Send + Sync {
    /// Predicted costs at n points given as a (n, nx) matrix, one per point
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>>;
}

/// Scale information gains (n, 1) by `log(cost + COST_OFFSET)` of their points.
///
/// Costs lower than one give a negative denominator which flips the sign of
/// the acquisition value, negative costs give NaN. Neither is guarded.
pub fn cost_normalize(gain: &Array2<f64>, cost: &Array1<f64>) -> Array2<f64> {
    let mut res = gain.to_owned();
    Zip::from(res.rows_mut())
        .and(cost)
        .for_each(|mut row, &c| row /= (c + COST_OFFSET).ln());
    res
}

/// Predicted cost of each row of `x`, extra predictions are dropped
pub(crate) fn predict_costs(model: &dyn CostModel, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
    let costs = model.predict(x)?;
    if costs.len() < x.nrows() {
        return Err(EesError::CostModelError(format!(
            "{} costs predicted for {} points",
            costs.len(),
            x.nrows()
        )));
    }
    Ok(costs.slice(s![..x.nrows()]).to_owned())
}
