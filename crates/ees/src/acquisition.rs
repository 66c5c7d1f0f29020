use crate::cost::{cost_normalize, predict_costs, CostModel};
use crate::environment::EnvironmentMask;
use crate::errors::{EesError, Result};
use crate::estimators::{AnalyticEstimator, EntropyEstimator, InputShape, MonteCarloEstimator};
use envsearch_entropy::{Entropy, EntropyEngine, EntropyMc, EntropyParams, SurrogateModel};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Dimension, Ix1, Ix2};
use std::sync::Arc;

/// Environment entropy search acquisition function.
///
/// Candidates are scored by the information they bring about the location of
/// the minimizer *at full fidelity*, that is with environment variables at their
/// upper bound, divided by `log(cost + 1e-8)` of their predicted evaluation cost.
/// Representer points of the minimizer distribution are therefore projected onto
/// the full fidelity subspace while candidates may lie anywhere in the input space.
///
/// The information gain is estimated by `E`, either [`AnalyticEstimator`] or
/// [`MonteCarloEstimator`].
pub struct EnvEntropySearch<E: EntropyEstimator> {
    estimator: E,
    mask: EnvironmentMask,
    cost_model: Option<Arc<dyn CostModel>>,
}

/// Environment entropy search with the analytic information gain
pub type EnvEntropySearchAnalytic = EnvEntropySearch<AnalyticEstimator<Entropy>>;
/// Environment entropy search with the Monte-Carlo information gain
pub type EnvEntropySearchMc = EnvEntropySearch<MonteCarloEstimator<EntropyMc>>;

impl EnvEntropySearch<AnalyticEstimator<Entropy>> {
    /// Analytic acquisition over the input space of `params` where
    /// `is_env` flags environment variables
    pub fn analytic(params: EntropyParams, is_env: Array1<bool>) -> Result<Self> {
        let engine = Entropy::new(params.env_variables(is_env.clone()))?;
        Self::new(AnalyticEstimator::new(engine), is_env)
    }
}

impl EnvEntropySearch<MonteCarloEstimator<EntropyMc>> {
    /// Monte-Carlo acquisition over the input space of `params` where
    /// `is_env` flags environment variables
    pub fn monte_carlo(params: EntropyParams, is_env: Array1<bool>) -> Result<Self> {
        let engine = EntropyMc::new(params.env_variables(is_env.clone()))?;
        Self::new(MonteCarloEstimator::new(engine), is_env)
    }
}

impl<E: EntropyEstimator> EnvEntropySearch<E> {
    /// Acquisition using `estimator`, `is_env` flags environment variables
    /// of the engine input space.
    ///
    /// The engine incumbent configuration is left untouched: use [`EnvEntropySearch::analytic`]
    /// or [`EnvEntropySearch::monte_carlo`] to get the incumbent searched at full fidelity.
    pub fn new(estimator: E, is_env: Array1<bool>) -> Result<Self> {
        let mask = EnvironmentMask::new(is_env, estimator.engine().xlimits())?;
        Ok(EnvEntropySearch {
            estimator,
            mask,
            cost_model: None,
        })
    }

    /// Take new surrogate and cost models into account: representer points
    /// are resampled, projected and the minimizer belief refreshed
    pub fn update(
        &mut self,
        model: Arc<dyn SurrogateModel>,
        cost_model: Arc<dyn CostModel>,
    ) -> Result<()> {
        self.cost_model = Some(cost_model);
        self.estimator.engine_mut().set_model(model);
        self.update_representer_points()
    }

    /// Resample representer points, project them onto the full fidelity
    /// subspace and refresh the minimizer belief accordingly
    pub fn update_representer_points(&mut self) -> Result<()> {
        let engine = self.estimator.engine_mut();
        engine.update_representer_points()?;
        self.mask.project(engine.representer_points_mut())?;
        engine.refresh()?;
        info!(
            "{} representer points updated ({} estimator)",
            self.estimator.engine().representer_points().nrows(),
            self.estimator.name()
        );
        Ok(())
    }

    /// Acquisition values at candidate points `x` given as a (n, nx) matrix,
    /// returned as a (n, 1) matrix.
    ///
    /// With a batch estimator a single point may be given as a flat vector of
    /// length nx. The Monte-Carlo estimator only accepts one point given as a
    /// (1, nx) matrix.
    pub fn score<D: Dimension>(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, D>,
    ) -> Result<Array2<f64>> {
        let cost_model = self.cost_model.as_deref().ok_or(EesError::NotUpdated)?;
        let x = self.as_batch(x)?;
        let cost = predict_costs(cost_model, &x)?;
        let gain = self.estimator.information_gain(&x)?;
        if gain.nrows() != cost.len() {
            return Err(EesError::InvalidBatchSize {
                expected: cost.len(),
                actual: gain.nrows(),
            });
        }
        Ok(cost_normalize(&gain, &cost))
    }

    /// Same as [`EnvEntropySearch::score`], derivatives are not available
    /// and `derivative` is ignored
    pub fn score_with_derivative<D: Dimension>(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, D>,
        derivative: bool,
    ) -> Result<Array2<f64>> {
        if derivative {
            debug!("Acquisition derivatives not available, ignored");
        }
        self.score(x)
    }

    fn as_batch<'a, D: Dimension>(
        &self,
        x: &'a ArrayBase<impl Data<Elem = f64>, D>,
    ) -> Result<ArrayView2<'a, f64>> {
        let shape = self.estimator.input_shape();
        let x = match x.ndim() {
            1 if shape == InputShape::Batch => {
                x.view().into_dimensionality::<Ix1>()?.insert_axis(Axis(0))
            }
            2 => x.view().into_dimensionality::<Ix2>()?,
            ndim => {
                return Err(EesError::InvalidDimension {
                    expected: 2,
                    actual: ndim,
                })
            }
        };
        if x.ncols() != self.mask.n_dims() {
            return Err(EesError::InvalidDimension {
                expected: self.mask.n_dims(),
                actual: x.ncols(),
            });
        }
        if shape == InputShape::Single && x.nrows() != 1 {
            return Err(EesError::InvalidBatchSize {
                expected: 1,
                actual: x.nrows(),
            });
        }
        Ok(x)
    }

    /// Information gain estimator
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Environment variables mask
    pub fn mask(&self) -> &EnvironmentMask {
        &self.mask
    }

    /// Current representer points, projected onto the full fidelity subspace
    pub fn representer_points(&self) -> &Array2<f64> {
        self.estimator.engine().representer_points()
    }

    /// Input space dimension
    pub fn n_dims(&self) -> usize {
        self.mask.n_dims()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use envsearch_entropy::testing::KernelSurrogate;
    use envsearch_entropy::{
        AnalyticEntropyEngine, EntropyState, MonteCarloEntropyEngine, Result as EntropyResult,
    };
    use ndarray::array;
    use ndarray_stats::QuantileExt;

    struct ConstantCost(f64);

    impl CostModel for ConstantCost {
        fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
            Ok(Array1::from_elem(x.nrows(), self.0))
        }
    }

    /// Engine returning a constant gain over fixed representer points
    struct StubEngine {
        xlimits: Array2<f64>,
        state: EntropyState,
        refreshed_with: Option<Array2<f64>>,
        dh: f64,
        new_pmin: Array1<f64>,
    }

    impl StubEngine {
        fn new(dh: f64) -> Self {
            StubEngine {
                xlimits: array![[0., 1.], [0., 1.]],
                state: EntropyState::default(),
                refreshed_with: None,
                dh,
                new_pmin: array![0.5, 0.5],
            }
        }
    }

    impl EntropyEngine for StubEngine {
        fn name(&self) -> &'static str {
            "Stub"
        }
        fn xlimits(&self) -> &Array2<f64> {
            &self.xlimits
        }
        fn set_model(&mut self, _model: Arc<dyn SurrogateModel>) {}
        fn update_representer_points(&mut self) -> EntropyResult<()> {
            self.state.zb = array![[0.1, 0.3], [0.6, 0.9]];
            self.state.lmb = array![0., 0.];
            Ok(())
        }
        fn representer_points(&self) -> &Array2<f64> {
            &self.state.zb
        }
        fn representer_points_mut(&mut self) -> &mut Array2<f64> {
            &mut self.state.zb
        }
        fn refresh(&mut self) -> EntropyResult<()> {
            self.refreshed_with = Some(self.state.zb.clone());
            self.state.pmin = array![1., 0.];
            self.state.log_p = array![0., -700.];
            self.state.f = Array2::zeros((2, 4));
            Ok(())
        }
    }

    impl AnalyticEntropyEngine for StubEngine {
        fn compute(&self, x: &ArrayView2<f64>, _derivative: bool) -> EntropyResult<Array2<f64>> {
            Ok(Array2::from_elem((x.nrows(), 1), self.dh))
        }
    }

    impl MonteCarloEntropyEngine for StubEngine {
        fn state(&self) -> &EntropyState {
            &self.state
        }
        fn change_pmin_by_innovation(
            &self,
            _x: &ArrayView2<f64>,
            _f: &ArrayView2<f64>,
        ) -> EntropyResult<Array1<f64>> {
            Ok(self.new_pmin.clone())
        }
    }

    fn surrogate() -> Arc<dyn SurrogateModel> {
        let xt = array![[0., 0.], [0.5, 0.5], [1., 0.2], [0.3, 1.], [0.8, 0.9]];
        let yt = xt.map_axis(Axis(1), |x| (x[0] - 0.6f64).powi(2) + 0.5 * (1. - x[1]));
        Arc::new(KernelSurrogate::new(&xt, &yt, array![0.3, 0.5], 1., 1e-6).unwrap())
    }

    #[test]
    fn test_analytic_score_with_stub() {
        let mut acq = EnvEntropySearch::new(
            AnalyticEstimator::new(StubEngine::new(0.3)),
            array![false, true],
        )
        .unwrap();
        acq.update(surrogate(), Arc::new(ConstantCost(2.))).unwrap();

        // projected before the belief refresh
        let seen = acq.estimator().engine().refreshed_with.clone().unwrap();
        assert_eq!(array![1., 1.], seen.column(1));
        assert_eq!(array![0.1, 0.6], seen.column(0));
        assert_eq!(&seen, acq.representer_points());

        let value = acq.score(&array![[0.5, 0.2]]).unwrap();
        assert_eq!(&[1, 1], value.shape());
        assert_abs_diff_eq!(0.3 / (2f64 + 1e-8).ln(), value[[0, 0]], epsilon = 1e-12);
        assert_abs_diff_eq!(0.4328, value[[0, 0]], epsilon = 1e-4);
    }

    #[test]
    fn test_batch_promotion() {
        let mut acq = EnvEntropySearch::new(
            AnalyticEstimator::new(StubEngine::new(0.3)),
            array![false, true],
        )
        .unwrap();
        acq.update(surrogate(), Arc::new(ConstantCost(3.))).unwrap();
        let flat = acq.score(&array![0.5, 0.2]).unwrap();
        let batch = acq.score(&array![[0.5, 0.2]]).unwrap();
        assert_eq!(batch, flat);
        let many = acq.score(&array![[0.5, 0.2], [0.1, 0.7], [0.9, 0.]]).unwrap();
        assert_eq!(&[3, 1], many.shape());
        let ignored = acq.score_with_derivative(&array![[0.5, 0.2]], true).unwrap();
        assert_eq!(batch, ignored);
    }

    #[test]
    fn test_cheap_cost_sign_flip() {
        let mut acq = EnvEntropySearch::new(
            AnalyticEstimator::new(StubEngine::new(0.3)),
            array![false, true],
        )
        .unwrap();
        acq.update(surrogate(), Arc::new(ConstantCost(0.5))).unwrap();
        let value = acq.score(&array![[0.5, 0.2]]).unwrap();
        assert!(value[[0, 0]] < 0.);
    }

    #[test]
    fn test_score_errors() {
        let mut acq = EnvEntropySearch::new(
            AnalyticEstimator::new(StubEngine::new(0.3)),
            array![false, true],
        )
        .unwrap();
        assert!(matches!(
            acq.score(&array![[0.5, 0.2]]),
            Err(EesError::NotUpdated)
        ));
        acq.update(surrogate(), Arc::new(ConstantCost(2.))).unwrap();
        assert!(matches!(
            acq.score(&array![[0.5, 0.2, 0.1]]),
            Err(EesError::InvalidDimension {
                expected: 2,
                actual: 3
            })
        ));
        assert!(EnvEntropySearch::new(
            AnalyticEstimator::new(StubEngine::new(0.3)),
            array![true],
        )
        .is_err());
    }

    #[test]
    fn test_monte_carlo_score_with_stub() {
        let mut acq = EnvEntropySearch::new(
            MonteCarloEstimator::new(StubEngine::new(0.)),
            array![false, true],
        )
        .unwrap();
        acq.update(surrogate(), Arc::new(ConstantCost(2.))).unwrap();
        let value = acq.score(&array![[0.5, 0.2]]).unwrap();
        assert_eq!(&[1, 1], value.shape());
        // pmin [1, 0] fantasized into [0.5, 0.5]
        let expected = std::f64::consts::LN_2 / (2f64 + 1e-8).ln();
        assert_abs_diff_eq!(expected, value[[0, 0]], epsilon = 1e-12);

        assert!(matches!(
            acq.score(&array![0.5, 0.2]),
            Err(EesError::InvalidDimension {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            acq.score(&array![[0.5, 0.2], [0.1, 0.1]]),
            Err(EesError::InvalidBatchSize {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_analytic_end_to_end() {
        let params = Entropy::params(&array![[0., 1.], [0., 1.]])
            .n_representer(10)
            .n_quadrature(20)
            .seed(42);
        let mut acq = EnvEntropySearch::analytic(params, array![false, true]).unwrap();
        acq.update(surrogate(), Arc::new(ConstantCost(2.))).unwrap();
        let zb = acq.representer_points();
        assert_eq!(&[10, 2], zb.shape());
        assert!(zb.column(1).iter().all(|&v| v == 1.));
        assert!(zb.column(0).iter().all(|&v| (0. ..=1.).contains(&v)));

        let value = acq.score(&array![[0.5, 0.2], [0.2, 0.9]]).unwrap();
        assert_eq!(&[2, 1], value.shape());
        assert!(value.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_analytic_prefers_unobserved_points() {
        let params = Entropy::params(&array![[0., 1.], [0., 1.]])
            .n_representer(10)
            .n_quadrature(20)
            .seed(42);
        let mut acq = EnvEntropySearch::analytic(params, array![false, true]).unwrap();
        acq.update(surrogate(), Arc::new(ConstantCost(2.))).unwrap();

        // first candidate is a training point
        let x = array![[0.3, 1.], [0.6, 1.], [0.1, 0.5]];
        let value = acq.score(&x).unwrap();
        assert_abs_diff_eq!(0., value[[0, 0]], epsilon = 1e-4);
        assert!(value[[1, 0]] > 0.);
        assert_ne!(0, value.column(0).argmax().unwrap());
    }

    #[test]
    fn test_monte_carlo_end_to_end() {
        let params = EntropyMc::params(&array![[0., 1.], [0., 1.]])
            .n_func_samples(50)
            .n_hals_vals(20)
            .seed(42);
        let mut acq = EnvEntropySearch::monte_carlo(params, array![false, true]).unwrap();
        acq.update(surrogate(), Arc::new(ConstantCost(2.))).unwrap();
        let zb = acq.representer_points();
        assert_eq!(&[10, 2], zb.shape());
        assert!(zb.column(1).iter().all(|&v| v == 1.));
        let state = acq.estimator().engine().state();
        assert_abs_diff_eq!(1., state.pmin.sum(), epsilon = 1e-12);

        let value = acq.score(&array![[0.5, 0.2]]).unwrap();
        assert_eq!(&[1, 1], value.shape());
        assert!(value[[0, 0]].is_finite());
    }
}
