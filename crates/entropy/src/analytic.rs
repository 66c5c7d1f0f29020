use crate::engine::{AnalyticEntropyEngine, EntropyEngine};
use crate::epmgp::joint_min;
use crate::errors::{EntropyError, Result};
use crate::innovation::gp_innovation_local;
use crate::parameters::{EntropyParams, EntropyValidParams, DEFAULT_N_REPRESENTER};
use crate::representers::sample_representer_points;
use crate::state::{entropy_term, EntropyState};
use crate::surrogates::SurrogateModel;
use crate::utils::{log_sum_exp, normal_quantiles};
use linfa::ParamGuard;
use log::{debug, info};
use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis, Zip};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use std::sync::Arc;

/// Entropy search engine estimating the information gain analytically.
///
/// The minimizer distribution over representer points is approximated by
/// expectation propagation ([`joint_min`]). The effect of an observation
/// is predicted with a second order expansion of `log pmin` with respect to
/// the posterior mean and covariance at representer points, averaged over
/// deterministic quantiles of the observation outcome.
pub struct Entropy {
    params: EntropyValidParams,
    model: Option<Arc<dyn SurrogateModel>>,
    rng: Xoshiro256Plus,
    state: EntropyState,
    /// `d log pmin / d mu` (n_representer, n_representer)
    dlogp_dmu: Array2<f64>,
    /// `0.5 * d2 log pmin / d mu2 - d log pmin / d sigma` per representer point
    quad: Array3<f64>,
    /// standardized observation outcomes
    w: Array1<f64>,
}

impl Entropy {
    /// Default parameters of the analytic engine within `xlimits` (nx, 2)
    pub fn params(xlimits: &Array2<f64>) -> EntropyParams {
        EntropyParams::new(xlimits, DEFAULT_N_REPRESENTER)
    }

    /// Build the engine, no surrogate is attached until [`EntropyEngine::update`]
    pub fn new(params: EntropyParams) -> Result<Self> {
        let params = params.check()?;
        let rng = match params.seed() {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        let w = normal_quantiles(params.n_quadrature())?;
        Ok(Entropy {
            params,
            model: None,
            rng,
            state: EntropyState::default(),
            dlogp_dmu: Array2::zeros((0, 0)),
            quad: Array3::zeros((0, 0, 0)),
            w,
        })
    }

    /// Validated parameters
    pub fn parameters(&self) -> &EntropyValidParams {
        &self.params
    }

    /// Current belief, `f` stays empty
    pub fn state(&self) -> &EntropyState {
        &self.state
    }

    fn model(&self) -> Result<&dyn SurrogateModel> {
        self.model.as_deref().ok_or(EntropyError::NotUpdated)
    }

    fn in_bounds(&self, x: &ArrayView1<f64>) -> bool {
        Zip::from(x)
            .and(self.params.xlimits().rows())
            .all(|&v, b| b[0] <= v && v <= b[1])
    }

    /// Expected decrease of the entropy `-sum(p * (log p + lmb))` of the
    /// minimizer distribution when observing at `x`
    fn dh(&self, x: &ArrayView1<f64>) -> Result<f64> {
        if !self.in_bounds(x) {
            return Ok(0.);
        }
        let model = self.model()?;
        let state = &self.state;
        let lx = gp_innovation_local(model, &state.zb, &x.insert_axis(Axis(0)))?;

        // deterministic part: covariance shrinkage and mean spread
        let det = Array1::from_iter(self.quad.outer_iter().map(|q| lx.dot(&q.dot(&lx))));
        let base = &state.log_p + &det;
        // stochastic part: mean shift per unit outcome
        let stoch = self.dlogp_dmu.dot(&lx);

        let h_new = self
            .w
            .iter()
            .map(|&wt| {
                let mut lpred = &base + &(&stoch * wt);
                let lse = log_sum_exp(&lpred.view());
                lpred.mapv_inplace(|v| v - lse);
                entropy_term(&lpred.mapv(f64::exp), &lpred, &state.lmb)
            })
            .sum::<f64>()
            / self.w.len() as f64;
        Ok(h_new - state.entropy_term())
    }
}

impl EntropyEngine for Entropy {
    fn name(&self) -> &'static str {
        "Entropy"
    }

    fn xlimits(&self) -> &Array2<f64> {
        self.params.xlimits()
    }

    fn set_model(&mut self, model: Arc<dyn SurrogateModel>) {
        self.model = Some(model);
    }

    fn update_representer_points(&mut self) -> Result<()> {
        let model = self.model.clone().ok_or(EntropyError::NotUpdated)?;
        let points = sample_representer_points(model.as_ref(), &self.params, &mut self.rng)?;
        self.state.zb = points.zb;
        self.state.lmb = points.lmb;
        Ok(())
    }

    fn representer_points(&self) -> &Array2<f64> {
        &self.state.zb
    }

    fn representer_points_mut(&mut self) -> &mut Array2<f64> {
        &mut self.state.zb
    }

    fn refresh(&mut self) -> Result<()> {
        if self.state.n_representer() == 0 {
            return Err(EntropyError::NotUpdated);
        }
        let model = self.model()?;
        let zb = self.state.zb.view();
        let (mb, _) = model.predict_valvar(&zb)?;
        let vb = model.predict_covariance(&zb, &zb)?;
        let belief = joint_min(&mb.view(), &vb.view(), self.params.ep_tolerance())?;

        self.quad = 0.5 * belief.d2logp_dmu2 - belief.dlogp_dsigma;
        self.dlogp_dmu = belief.dlogp_dmu;
        self.state.pmin = belief.log_p.mapv(f64::exp);
        self.state.log_p = belief.log_p;
        info!(
            "{} belief refreshed over {} representer points (entropy term {:.4})",
            self.name(),
            self.state.n_representer(),
            self.state.entropy_term()
        );
        Ok(())
    }
}

impl AnalyticEntropyEngine for Entropy {
    fn compute(&self, x: &ArrayView2<f64>, derivative: bool) -> Result<Array2<f64>> {
        if derivative {
            debug!("Derivatives of the information gain are not available, ignored");
        }
        let nx = self.params.xlimits().nrows();
        if x.ncols() != nx {
            return Err(EntropyError::InvalidDimension {
                expected: nx,
                actual: x.ncols(),
            });
        }
        let gains = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| self.dh(&row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Array1::from(gains).insert_axis(Axis(1)))
    }
}
