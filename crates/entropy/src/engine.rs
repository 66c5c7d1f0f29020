use crate::errors::Result;
use crate::state::EntropyState;
use crate::surrogates::SurrogateModel;
use ndarray::{Array1, Array2, ArrayView2};
use std::sync::Arc;

/// A trait for entropy search engines maintaining representer points
/// and a belief over the minimizer location
pub trait EntropyEngine {
    /// Name of the engine
    fn name(&self) -> &'static str;

    /// Input space as a (nx, 2) matrix of \[lower bound, upper bound\] rows
    fn xlimits(&self) -> &Array2<f64>;

    /// Replace the surrogate model of the objective function
    fn set_model(&mut self, model: Arc<dyn SurrogateModel>);

    /// Sample new representer points from the current surrogate (unprojected)
    fn update_representer_points(&mut self) -> Result<()>;

    /// Current representer points (n_representer, nx)
    fn representer_points(&self) -> &Array2<f64>;

    /// Mutable access to representer points, the belief has to be
    /// [refreshed](EntropyEngine::refresh) afterwards
    fn representer_points_mut(&mut self) -> &mut Array2<f64>;

    /// Recompute the belief over the minimizer at current representer points
    fn refresh(&mut self) -> Result<()>;

    /// Take the new surrogate into account: resample representer points
    /// and recompute the belief
    fn update(&mut self, model: Arc<dyn SurrogateModel>) -> Result<()> {
        self.set_model(model);
        self.update_representer_points()?;
        self.refresh()
    }
}

/// An entropy search engine computing the expected information gain analytically
pub trait AnalyticEntropyEngine: EntropyEngine {
    /// Expected information gain about the minimizer location when observing at
    /// each of the n points `x` given as a (n, nx) matrix. Returns a (n, 1) matrix.
    ///
    /// Derivatives are not available: `derivative` is accepted for API
    /// compatibility and ignored.
    fn compute(&self, x: &ArrayView2<f64>, derivative: bool) -> Result<Array2<f64>>;
}

/// An entropy search engine relying on Monte-Carlo function samples
pub trait MonteCarloEntropyEngine: EntropyEngine {
    /// Current belief state
    fn state(&self) -> &EntropyState;

    /// Minimizer distribution that would result from observing at `x` (1, nx),
    /// fantasized by innovating the function samples `f`
    fn change_pmin_by_innovation(&self, x: &ArrayView2<f64>, f: &ArrayView2<f64>)
        -> Result<Array1<f64>>;
}
