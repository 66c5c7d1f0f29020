//! Estimators of the information gained about the minimizer location
//! by an observation, built on top of entropy search engines.
use crate::errors::Result;
use envsearch_entropy::{
    entropy_term, AnalyticEntropyEngine, EntropyEngine, EntropyState, MonteCarloEntropyEngine,
};
use ndarray::{Array1, Array2, ArrayView2};

/// Points accepted by an estimator in one call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputShape {
    /// Any number of points, a single point may be given as a flat vector
    Batch,
    /// Exactly one point given as a (1, nx) matrix
    Single,
}

/// A trait for estimators of the information gain of candidate points
pub trait EntropyEstimator {
    /// Underlying entropy search engine
    type Engine: EntropyEngine;

    /// Name of the estimator
    fn name(&self) -> &'static str;

    /// Points accepted by [`EntropyEstimator::information_gain`]
    fn input_shape(&self) -> InputShape;

    /// Underlying engine
    fn engine(&self) -> &Self::Engine;

    /// Mutable underlying engine
    fn engine_mut(&mut self) -> &mut Self::Engine;

    /// Raw information gain at n points given as a (n, nx) matrix, as a (n, 1) matrix
    fn information_gain(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>>;
}

/// Estimator delegating to the analytic computation of the engine
#[derive(Clone, Debug)]
pub struct AnalyticEstimator<B> {
    engine: B,
}

impl<B: AnalyticEntropyEngine> AnalyticEstimator<B> {
    /// Estimator over the given engine
    pub fn new(engine: B) -> Self {
        AnalyticEstimator { engine }
    }
}

impl<B: AnalyticEntropyEngine> EntropyEstimator for AnalyticEstimator<B> {
    type Engine = B;

    fn name(&self) -> &'static str {
        "Analytic"
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Batch
    }

    fn engine(&self) -> &B {
        &self.engine
    }

    fn engine_mut(&mut self) -> &mut B {
        &mut self.engine
    }

    fn information_gain(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
        Ok(self.engine.compute(x, false)?)
    }
}

/// Estimator comparing the current minimizer distribution with the one
/// fantasized by the engine for an observation at the candidate point
#[derive(Clone, Debug)]
pub struct MonteCarloEstimator<B> {
    engine: B,
}

impl<B: MonteCarloEntropyEngine> MonteCarloEstimator<B> {
    /// Estimator over the given engine
    pub fn new(engine: B) -> Self {
        MonteCarloEstimator { engine }
    }
}

impl<B: MonteCarloEntropyEngine> EntropyEstimator for MonteCarloEstimator<B> {
    type Engine = B;

    fn name(&self) -> &'static str {
        "MonteCarlo"
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Single
    }

    fn engine(&self) -> &B {
        &self.engine
    }

    fn engine_mut(&mut self) -> &mut B {
        &mut self.engine
    }

    fn information_gain(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
        let state = self.engine.state();
        let new_pmin = self.engine.change_pmin_by_innovation(x, &state.f.view())?;
        Ok(Array2::from_elem((1, 1), entropy_loss(state, &new_pmin)))
    }
}

/// `H_old - H_new` where `H = sum(p * (log p + lmb))`.
///
/// `lmb` of the current state is reused for the fantasized distribution `new_pmin`.
pub fn entropy_loss(state: &EntropyState, new_pmin: &Array1<f64>) -> f64 {
    let h_old = state.entropy_term();
    let h_new = entropy_term(new_pmin, &new_pmin.mapv(f64::ln), &state.lmb);
    -h_new + h_old
}
